//! Per-message orchestration: resolve, fetch, transcode, deliver.
//!
//! Every candidate runs on its own task so that a failure or a panic in one
//! cannot reach its siblings. Workers are bounded by a per-run semaphore and
//! results are delivered in extraction order.

use std::{fmt, sync::Arc};

use {
    tokio::sync::Semaphore,
    tracing::{Instrument, debug, info, info_span, warn},
    webp2u_config::MediaConfig,
};

use crate::{
    Error, Result,
    candidate::MediaCandidate,
    fetch::Fetcher,
    http::MediaClient,
    profile::MediaKind,
    resolve::Resolver,
    sink::{MediaSink, ReplyTarget},
    store::StoreLimits,
    transcode::{Converted, Transcoder},
    video::{FfmpegEngine, VideoEngine},
};

/// Terminal state of one candidate.
#[derive(Debug)]
pub enum Outcome {
    Delivered(MediaKind),
    /// Not a supported media link. Not an error.
    Unsupported,
    ResolveFailed(Error),
    FetchFailed(Error),
    TranscodeFailed(Error),
    DeliveryFailed(anyhow::Error),
    /// The candidate's worker panicked or was cancelled.
    Aborted(Error),
}

impl Outcome {
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Delivered(_) | Self::Unsupported)
    }

    /// The stage the candidate stopped in.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Unsupported | Self::ResolveFailed(_) => "resolve",
            Self::FetchFailed(_) => "fetch",
            Self::TranscodeFailed(_) => "transcode",
            Self::Delivered(_) | Self::DeliveryFailed(_) => "deliver",
            Self::Aborted(_) => "worker",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered(kind) => write!(f, "delivered {kind}"),
            Self::Unsupported => f.write_str("unsupported"),
            Self::ResolveFailed(e) | Self::FetchFailed(e) | Self::TranscodeFailed(e) => {
                write!(f, "{} failed: {e}", self.stage())
            },
            Self::DeliveryFailed(e) => write!(f, "deliver failed: {e:#}"),
            Self::Aborted(e) => write!(f, "aborted: {e}"),
        }
    }
}

#[derive(Debug)]
pub struct CandidateReport {
    pub url: String,
    pub outcome: Outcome,
}

#[derive(Debug)]
pub struct Pipeline {
    resolver: Resolver,
    fetcher: Fetcher,
    transcoder: Transcoder,
    limits: StoreLimits,
    max_concurrency: usize,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        resolver: Resolver,
        fetcher: Fetcher,
        transcoder: Transcoder,
        limits: StoreLimits,
        max_concurrency: usize,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            transcoder,
            limits,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Standard pipeline with the `ffmpeg` video engine.
    pub fn from_config(config: &MediaConfig) -> Result<Self> {
        Self::with_engine(config, Arc::new(FfmpegEngine::from_config(&config.ffmpeg)))
    }

    pub fn with_engine(config: &MediaConfig, engine: Arc<dyn VideoEngine>) -> Result<Self> {
        let client = MediaClient::from_config(config)?;
        Ok(Self::new(
            Resolver::standard(client.clone()),
            Fetcher::from_config(client, config),
            Transcoder::new(engine, config.jpeg_quality),
            StoreLimits::from_config(config),
            config.max_concurrency,
        ))
    }

    /// Process every URL of one message and deliver what converts.
    ///
    /// Never fails as a whole; each URL gets its own report, in input order.
    pub async fn run(
        self: &Arc<Self>,
        urls: Vec<String>,
        sink: &dyn MediaSink,
        target: &ReplyTarget,
    ) -> Vec<CandidateReport> {
        if urls.is_empty() {
            return Vec::new();
        }

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let workers: Vec<_> = urls
            .into_iter()
            .map(|url| {
                let pipeline = Arc::clone(self);
                let permits = Arc::clone(&permits);
                let span = info_span!("candidate", url = %url);
                let worker_url = url.clone();
                let handle = tokio::spawn(
                    async move {
                        let _permit = permits.acquire_owned().await;
                        pipeline.prepare(worker_url).await
                    }
                    .instrument(span),
                );
                (url, handle)
            })
            .collect();

        let mut reports = Vec::with_capacity(workers.len());
        for (url, handle) in workers {
            let outcome = match handle.await {
                Ok(Ok(converted)) => deliver(converted, sink, target).await,
                Ok(Err(outcome)) => outcome,
                Err(join) => Outcome::Aborted(Error::Task(join)),
            };
            log_outcome(&url, target, &outcome);
            reports.push(CandidateReport { url, outcome });
        }
        reports
    }

    /// Everything up to delivery. The candidate's stores are dropped on
    /// every early return.
    async fn prepare(&self, url: String) -> std::result::Result<Converted, Outcome> {
        let mut candidate = MediaCandidate::new(url, self.limits);

        match candidate.resolve(&self.resolver).await {
            Ok(Some(_)) => {},
            Ok(None) => return Err(Outcome::Unsupported),
            Err(e) => return Err(Outcome::ResolveFailed(e)),
        }

        self.fetcher
            .fetch(&mut candidate)
            .await
            .map_err(Outcome::FetchFailed)?;

        self.transcoder
            .run(candidate)
            .await
            .map_err(Outcome::TranscodeFailed)
    }
}

async fn deliver(converted: Converted, sink: &dyn MediaSink, target: &ReplyTarget) -> Outcome {
    let Converted { kind, output } = converted;
    let sent = match kind {
        MediaKind::Image => sink.send_photo(target, output).await,
        MediaKind::Video => sink.send_video(target, output).await,
    };
    match sent {
        Ok(()) => Outcome::Delivered(kind),
        Err(e) => Outcome::DeliveryFailed(e),
    }
}

fn log_outcome(url: &str, target: &ReplyTarget, outcome: &Outcome) {
    let chat_id = target.chat_id.as_str();
    match outcome {
        Outcome::Delivered(kind) => info!(url, chat_id, %kind, "media delivered"),
        Outcome::Unsupported => debug!(url, "not a supported media link"),
        Outcome::ResolveFailed(e)
        | Outcome::FetchFailed(e)
        | Outcome::TranscodeFailed(e)
        | Outcome::Aborted(e) => {
            warn!(url, chat_id, stage = outcome.stage(), error = %e, "candidate failed");
        },
        Outcome::DeliveryFailed(e) => {
            warn!(url, chat_id, stage = outcome.stage(), error = %format!("{e:#}"), "candidate failed");
        },
    }
}
