use std::{future::Future, path::Path, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{
        RequestError,
        prelude::*,
        types::{ChatId, InputFile, MessageId, ReplyParameters},
    },
    tracing::{debug, info, warn},
    webp2u_media::{ByteStore, MediaSink, ReplyTarget},
};

use crate::{Error, Result};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

const PHOTO_FILE_NAME: &str = "photo.jpg";
const VIDEO_FILE_NAME: &str = "video.mp4";

/// Uploads converted media to Telegram chats.
#[derive(Debug, Clone)]
pub struct TelegramOutbound {
    bot: Bot,
    reply_to_message: bool,
}

/// An upload source. A disk-backed store is kept alive until the upload is
/// done because teloxide reads the file lazily.
struct Upload {
    file: InputFile,
    _backing: Option<ByteStore>,
}

impl Upload {
    fn new(store: ByteStore, file_name: &'static str) -> Result<Self> {
        match store.path().map(Path::to_path_buf) {
            Some(path) => Ok(Self {
                file: InputFile::file(path).file_name(file_name),
                _backing: Some(store),
            }),
            None => Ok(Self {
                file: InputFile::memory(store.into_bytes()?).file_name(file_name),
                _backing: None,
            }),
        }
    }
}

impl TelegramOutbound {
    #[must_use]
    pub fn new(bot: Bot, reply_to_message: bool) -> Self {
        Self {
            bot,
            reply_to_message,
        }
    }

    /// Build reply parameters only when `reply_to_message` is enabled.
    fn reply_params(&self, target: &ReplyTarget) -> Option<ReplyParameters> {
        if self.reply_to_message {
            parse_reply_params(target.reply_to.as_deref())
        } else {
            None
        }
    }

    async fn send_document(
        &self,
        to: &str,
        chat_id: ChatId,
        upload: &Upload,
        reply_params: Option<&ReplyParameters>,
    ) -> std::result::Result<(), RequestError> {
        self.run_telegram_request_with_retry(to, "send document", || {
            let mut req = self.bot.send_document(chat_id, upload.file.clone());
            if let Some(rp) = reply_params {
                req = req.reply_parameters(rp.clone());
            }
            async move { req.await }
        })
        .await?;
        Ok(())
    }

    async fn run_telegram_request_with_retry<T, F, Fut>(
        &self,
        to: &str,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = to,
                            operation,
                            retries,
                            max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = to,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }
}

#[async_trait]
impl MediaSink for TelegramOutbound {
    async fn send_photo(&self, target: &ReplyTarget, photo: ByteStore) -> anyhow::Result<()> {
        let to = target.chat_id.as_str();
        let chat_id = parse_chat_id(to)?;
        let rp = self.reply_params(target);
        let bytes = photo.len();
        let upload = Upload::new(photo, PHOTO_FILE_NAME)?;

        let sent = self
            .run_telegram_request_with_retry(to, "send photo", || {
                let mut req = self.bot.send_photo(chat_id, upload.file.clone());
                if let Some(ref rp) = rp {
                    req = req.reply_parameters(rp.clone());
                }
                async move { req.await }
            })
            .await;

        match sent {
            Ok(_) => {
                info!(chat_id = to, reply_to = ?target.reply_to, bytes, "telegram photo sent");
                Ok(())
            },
            Err(e) if is_rejected_photo_error(&e) => {
                debug!(chat_id = to, error = %e, "photo rejected, retrying as document");
                self.send_document(to, chat_id, &upload, rp.as_ref())
                    .await?;
                info!(
                    chat_id = to,
                    reply_to = ?target.reply_to,
                    bytes,
                    "telegram photo sent as document fallback"
                );
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn send_video(&self, target: &ReplyTarget, video: ByteStore) -> anyhow::Result<()> {
        let to = target.chat_id.as_str();
        let chat_id = parse_chat_id(to)?;
        let rp = self.reply_params(target);
        let bytes = video.len();
        let upload = Upload::new(video, VIDEO_FILE_NAME)?;

        self.run_telegram_request_with_retry(to, "send video", || {
            let mut req = self
                .bot
                .send_video(chat_id, upload.file.clone())
                .supports_streaming(true);
            if let Some(ref rp) = rp {
                req = req.reply_parameters(rp.clone());
            }
            async move { req.await }
        })
        .await?;

        info!(chat_id = to, reply_to = ?target.reply_to, bytes, "telegram video sent");
        Ok(())
    }
}

fn parse_chat_id(to: &str) -> Result<ChatId> {
    to.parse::<i64>()
        .map(ChatId)
        .map_err(|source| Error::InvalidChatId {
            chat_id: to.to_owned(),
            source,
        })
}

/// Parse a platform message ID string into Telegram `ReplyParameters`.
/// Returns `None` if the string is not a valid i32 (Telegram message IDs are i32).
fn parse_reply_params(reply_to: Option<&str>) -> Option<ReplyParameters> {
    reply_to
        .and_then(|id| id.parse::<i32>().ok())
        .map(|id| ReplyParameters::new(MessageId(id)).allow_sending_without_reply())
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

/// Telegram refuses some valid JPEGs as photos (extreme aspect ratios, very
/// large sides); those still go through as documents.
fn is_rejected_photo_error(error: &RequestError) -> bool {
    let message = error.to_string();
    message.contains("PHOTO_INVALID_DIMENSIONS") || message.contains("PHOTO_SAVE_FILE_INVALID")
}
