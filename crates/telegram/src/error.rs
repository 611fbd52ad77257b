use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

    /// The polling HTTP client could not be built.
    #[error("failed to build telegram http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error(transparent)]
    Media(#[from] webp2u_media::Error),

    #[error("invalid telegram chat id: {chat_id}")]
    InvalidChatId {
        chat_id: String,
        #[source]
        source: ParseIntError,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
