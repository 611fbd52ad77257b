//! Config schema types (telegram, media pipeline, ffmpeg).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Desktop browser User-Agent sent on every probe and download. Some media
/// hosts refuse requests that look like bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/124.0.0.0 Safari/537.36";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Webp2uConfig {
    pub telegram: TelegramConfig,
    pub media: MediaConfig,
}

/// Telegram bot settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather. Usually supplied via `WEBP2U_TOKEN`.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Thread converted media under the message that carried the link.
    pub reply_to_message: bool,

    /// Long-polling timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,

    /// Ignore messages that start with a bot command.
    pub skip_commands: bool,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("reply_to_message", &self.reply_to_message)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("skip_commands", &self.skip_commands)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            reply_to_message: true,
            poll_timeout_secs: 30,
            skip_commands: true,
        }
    }
}

impl TelegramConfig {
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Media resolution and conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// User-Agent for HEAD probes and downloads.
    pub user_agent: String,
    /// Per-request timeout for probes and downloads.
    pub request_timeout_secs: u64,
    /// Hard ceiling for a single fetched or transcoded payload.
    pub max_bytes: u64,
    /// Payloads up to this size stay in memory; larger ones spill to a temp file.
    pub spill_threshold_bytes: usize,
    /// Write granularity used when streaming a download into its store.
    pub chunk_size: usize,
    /// Candidates from one message processed at the same time.
    pub max_concurrency: usize,
    /// JPEG quality for converted still images (1-100).
    pub jpeg_quality: u8,
    pub ffmpeg: FfmpegConfig,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.into(),
            request_timeout_secs: 10,
            max_bytes: 10 * 1024 * 1024,
            spill_threshold_bytes: 1024 * 1024,
            chunk_size: 4096,
            max_concurrency: 4,
            jpeg_quality: 85,
            ffmpeg: FfmpegConfig::default(),
        }
    }
}

/// External video transcoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    /// Explicit path to the ffmpeg binary. Falls back to `PATH` lookup.
    pub binary: Option<String>,
    /// Upper bound on a single video conversion.
    pub timeout_secs: u64,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: None,
            timeout_secs: 120,
        }
    }
}
