//! `webp2u convert`: run the pipeline on URLs from the command line and write
//! the results to disk instead of a chat.

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    clap::Args,
    tracing::info,
    webp2u_config::MediaConfig,
    webp2u_media::{ByteStore, MediaSink, Pipeline, ReplyTarget},
};

#[derive(Args)]
pub struct ConvertArgs {
    /// Links to convert.
    #[arg(required = true)]
    urls: Vec<String>,
    /// Directory the converted files are written to.
    #[arg(long, short, default_value = ".")]
    out: PathBuf,
}

pub async fn handle_convert(args: ConvertArgs, config: &MediaConfig) -> Result<()> {
    tokio::fs::create_dir_all(&args.out)
        .await
        .with_context(|| format!("cannot create {}", args.out.display()))?;

    let pipeline = Arc::new(Pipeline::from_config(config)?);
    let sink = FileSink::new(args.out);
    let reports = pipeline
        .run(args.urls, &sink, &ReplyTarget::new("local"))
        .await;

    let written = sink.written();
    let mut files = written.iter();
    for report in &reports {
        if report.outcome.is_delivered()
            && let Some(path) = files.next()
        {
            println!("{}: {} -> {}", report.url, report.outcome, path.display());
        } else {
            println!("{}: {}", report.url, report.outcome);
        }
    }

    if written.is_empty() {
        anyhow::bail!("nothing was converted");
    }
    Ok(())
}

/// Writes each delivered file as `<n>.jpg` or `<n>.mp4`, numbered from 1 in
/// delivery order.
pub struct FileSink {
    dir: PathBuf,
    next: AtomicUsize,
    written: Mutex<Vec<PathBuf>>,
}

impl FileSink {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            next: AtomicUsize::new(1),
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn written(&self) -> Vec<PathBuf> {
        self.written
            .lock()
            .map(|w| w.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }

    async fn write(&self, store: ByteStore, extension: &str) -> Result<()> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let dest = self.dir.join(format!("{n}.{extension}"));

        match store.path() {
            Some(path) => {
                tokio::fs::copy(path, &dest).await?;
            },
            None => tokio::fs::write(&dest, store.into_bytes()?).await?,
        }

        info!(path = %dest.display(), "wrote converted media");
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(dest);
        Ok(())
    }
}

#[async_trait]
impl MediaSink for FileSink {
    async fn send_photo(&self, _: &ReplyTarget, photo: ByteStore) -> Result<()> {
        self.write(photo, "jpg").await
    }

    async fn send_video(&self, _: &ReplyTarget, video: ByteStore) -> Result<()> {
        self.write(video, "mp4").await
    }
}
