//! Telegram front end for the webp2u media pipeline.
//!
//! Long-polls the Bot API, feeds every inbound message's links through the
//! pipeline and uploads the converted media back to the chat.

pub mod bot;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod state;

pub use {
    bot::start_polling,
    error::{Error, Result},
    outbound::TelegramOutbound,
    state::BotState,
};
