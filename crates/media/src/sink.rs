//! Delivery seam between the pipeline and a chat platform.

use {anyhow::Result, async_trait::async_trait};

use crate::store::ByteStore;

/// Where converted media goes: a chat, optionally as a reply to one message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplyTarget {
    pub chat_id: String,
    pub reply_to: Option<String>,
}

impl ReplyTarget {
    #[must_use]
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            reply_to: None,
        }
    }

    #[must_use]
    pub fn replying_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }
}

/// Delivery capability. Stores arrive sealed and rewound; implementations
/// own them from that point and drop them when the send completes.
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Deliver a JPEG as a photo.
    async fn send_photo(&self, target: &ReplyTarget, photo: ByteStore) -> Result<()>;

    /// Deliver an mp4 as a video.
    async fn send_video(&self, target: &ReplyTarget, video: ByteStore) -> Result<()>;
}
