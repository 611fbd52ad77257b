use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
    webp2u_config::TelegramConfig,
    webp2u_media::Pipeline,
};

use crate::{Result, handlers, state::BotState};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Connect the bot and start long polling.
///
/// Spawns a background task that processes updates until the returned
/// `CancellationToken` is cancelled.
pub async fn start_polling(
    config: TelegramConfig,
    pipeline: Arc<Pipeline>,
) -> Result<(CancellationToken, JoinHandle<()>)> {
    // Client timeout must outlast the long-poll timeout or the HTTP client
    // aborts the request before Telegram responds.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(config.poll_timeout_secs) + 15))
        .build()?;
    let bot = Bot::with_client(config.token.expose_secret(), client);

    // Verify credentials and get bot username.
    let me = bot.get_me().await?;

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    info!(username = ?me.username, "telegram bot connected (webhook cleared)");

    let state = Arc::new(BotState::new(bot, config, pipeline));
    let cancel = state.cancel.clone();
    let handle = tokio::spawn(poll_updates(state));
    Ok((cancel, handle))
}

/// The `getUpdates` loop. Returns when `state.cancel` fires or when another
/// instance takes over the token.
pub async fn poll_updates(state: Arc<BotState>) {
    info!("starting telegram manual polling loop");
    let mut offset: i32 = 0;

    loop {
        let request = state
            .bot
            .get_updates()
            .offset(offset)
            .timeout(state.config.poll_timeout_secs)
            .allowed_updates(vec![AllowedUpdate::Message]);

        let result = tokio::select! {
            () = state.cancel.cancelled() => {
                info!("telegram polling stopped");
                break;
            },
            result = request.send() => result,
        };

        match result {
            Ok(updates) => {
                debug!(count = updates.len(), "got telegram updates");
                for update in updates {
                    offset = update.id.as_offset();
                    match update.kind {
                        UpdateKind::Message(msg) => {
                            debug!(chat_id = msg.chat.id.0, "received telegram message");
                            handlers::spawn_message(msg, Arc::clone(&state));
                        },
                        other => {
                            debug!("ignoring non-message update: {other:?}");
                        },
                    }
                }
            },
            Err(e) => {
                // Another bot instance is running with the same token.
                if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                    warn!(
                        "telegram polling disabled: another instance is already running with this token"
                    );
                    state.cancel.cancel();
                    break;
                }

                warn!(error = %e, "telegram getUpdates failed");
                tokio::select! {
                    () = state.cancel.cancelled() => break,
                    () = tokio::time::sleep(ERROR_BACKOFF) => {},
                }
            },
        }
    }
}
