//! Video transcoding through an external engine.
//!
//! The default engine shells out to `ffmpeg`. The engine only sees file
//! paths; the caller owns both files and is responsible for cleanup.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use {async_trait::async_trait, tokio::process::Command, tracing::debug};

use webp2u_config::FfmpegConfig;

use crate::{Error, Result, profile::VideoParams};

const BINARY_NAME: &str = "ffmpeg";

/// Re-encodes a video file into the container and codecs named by `params`.
#[async_trait]
pub trait VideoEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn transcode(&self, input: &Path, output: &Path, params: &VideoParams) -> Result<()>;
}

/// `ffmpeg` subprocess engine.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    binary: Option<PathBuf>,
    timeout: Duration,
}

impl FfmpegEngine {
    #[must_use]
    pub fn new(binary: Option<PathBuf>, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    #[must_use]
    pub fn from_config(config: &FfmpegConfig) -> Self {
        Self::new(
            config.binary.as_deref().map(PathBuf::from),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Explicit path first, then `PATH`.
    fn find_binary(&self) -> Option<PathBuf> {
        if let Some(path) = &self.binary {
            return path.is_file().then(|| path.clone());
        }
        which::which(BINARY_NAME).ok()
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.find_binary().is_some()
    }

    /// Command-line arguments for one conversion.
    ///
    /// The scale filter rounds both dimensions down to even numbers, which
    /// yuv420p requires. `+faststart` moves the index to the front so clients
    /// can start playback while downloading.
    #[must_use]
    pub fn args(input: &Path, output: &Path, params: &VideoParams) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-y",
            "-i",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(input.as_os_str().to_owned());
        args.extend(
            [
                "-c:v",
                params.video_codec,
                "-pix_fmt",
                "yuv420p",
                "-vf",
                "scale=trunc(iw/2)*2:trunc(ih/2)*2",
                "-c:a",
                params.audio_codec,
                "-movflags",
                "+faststart",
                "-f",
                params.container,
            ]
            .into_iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl VideoEngine for FfmpegEngine {
    fn name(&self) -> &'static str {
        BINARY_NAME
    }

    async fn transcode(&self, input: &Path, output: &Path, params: &VideoParams) -> Result<()> {
        let binary = self.find_binary().ok_or_else(|| Error::EngineUnavailable {
            message: match &self.binary {
                Some(path) => format!("{} is not a file", path.display()),
                None => format!("{BINARY_NAME} not found in PATH"),
            },
        })?;

        let mut cmd = Command::new(&binary);
        cmd.args(Self::args(input, output, params))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(binary = %binary.display(), input = %input.display(), "starting ffmpeg");

        let result = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| Error::Timeout {
                operation: "ffmpeg",
                after: self.timeout,
            })?;
        let out = result?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(Error::engine(format!(
                "ffmpeg exited with {}: {}",
                out.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
