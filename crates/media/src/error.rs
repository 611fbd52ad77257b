use std::{error::Error as StdError, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("content-type probe failed for {url}: {source}")]
    Resolve {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("media exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("byte store is sealed for reading")]
    StoreSealed,

    #[error("byte store must be rewound before it is read")]
    StoreNotRewound,

    #[error("candidate was already resolved")]
    AlreadyResolved,

    #[error("candidate has no supported conversion profile")]
    Unresolved,

    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("video engine unavailable: {message}")]
    EngineUnavailable { message: String },

    #[error("video engine failed: {message}")]
    Engine { message: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("candidate worker aborted: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn external<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
