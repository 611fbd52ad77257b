use std::sync::Arc;

use {tokio_util::sync::CancellationToken, webp2u_config::TelegramConfig, webp2u_media::Pipeline};

use crate::outbound::TelegramOutbound;

/// Runtime state shared by the polling loop and every message task.
pub struct BotState {
    pub bot: teloxide::Bot,
    pub config: TelegramConfig,
    pub pipeline: Arc<Pipeline>,
    pub outbound: Arc<TelegramOutbound>,
    pub cancel: CancellationToken,
}

impl BotState {
    #[must_use]
    pub fn new(bot: teloxide::Bot, config: TelegramConfig, pipeline: Arc<Pipeline>) -> Self {
        let outbound = Arc::new(TelegramOutbound::new(bot.clone(), config.reply_to_message));
        Self {
            bot,
            config,
            pipeline,
            outbound,
            cancel: CancellationToken::new(),
        }
    }
}
