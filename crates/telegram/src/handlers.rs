use std::sync::Arc;

use {
    teloxide::types::{Message, MessageEntityKind},
    tokio::task::JoinHandle,
    tracing::{Instrument, debug, info_span},
    webp2u_media::{CandidateReport, ReplyTarget, extract_urls},
};

use crate::state::BotState;

/// Text of a message, or the caption of a media message.
pub fn message_text(msg: &Message) -> Option<&str> {
    msg.text().or_else(|| msg.caption())
}

/// Targets of `text_link` entities, i.e. hyperlinks whose display text
/// differs from the URL.
pub fn message_links(msg: &Message) -> Vec<&str> {
    msg.entities()
        .or_else(|| msg.caption_entities())
        .unwrap_or_default()
        .iter()
        .filter_map(|entity| match &entity.kind {
            MessageEntityKind::TextLink { url } => Some(url.as_str()),
            _ => None,
        })
        .collect()
}

fn is_command(text: &str) -> bool {
    text.starts_with('/')
}

/// Candidate URLs of a message: link entities first, then plain-text
/// matches. Commands yield nothing when `skip_commands` is set.
pub fn candidate_urls(msg: &Message, skip_commands: bool) -> Vec<String> {
    let Some(text) = message_text(msg) else {
        return Vec::new();
    };
    if skip_commands && is_command(text) {
        return Vec::new();
    }
    extract_urls(message_links(msg), text)
}

/// Reply target for converted media from `msg`.
pub fn reply_target(msg: &Message) -> ReplyTarget {
    ReplyTarget::new(msg.chat.id.0.to_string()).replying_to(msg.id.0.to_string())
}

/// Run the pipeline for one message and deliver through the bot's outbound.
pub async fn handle_message(msg: Message, state: &BotState) -> Vec<CandidateReport> {
    let urls = candidate_urls(&msg, state.config.skip_commands);
    if urls.is_empty() {
        debug!(chat_id = msg.chat.id.0, "no links in message");
        return Vec::new();
    }

    debug!(chat_id = msg.chat.id.0, count = urls.len(), "processing message links");
    let target = reply_target(&msg);
    state
        .pipeline
        .run(urls, state.outbound.as_ref(), &target)
        .await
}

/// Process `msg` on its own task so the polling loop never waits on a
/// conversion.
pub fn spawn_message(msg: Message, state: Arc<BotState>) -> JoinHandle<Vec<CandidateReport>> {
    let span = info_span!("message", chat_id = msg.chat.id.0, message_id = msg.id.0);
    tokio::spawn(async move { handle_message(msg, &state).await }.instrument(span))
}
