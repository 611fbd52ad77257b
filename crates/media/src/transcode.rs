//! Dispatch from a resolved candidate to the matching converter.

use std::sync::Arc;

use tracing::debug;

use crate::{
    Error, Result,
    candidate::MediaCandidate,
    image_ops,
    profile::{MediaKind, TranscodeParams, VideoParams},
    store::ByteStore,
    video::VideoEngine,
};

/// A finished conversion, ready for delivery.
#[derive(Debug)]
pub struct Converted {
    pub kind: MediaKind,
    pub output: ByteStore,
}

pub struct Transcoder {
    engine: Arc<dyn VideoEngine>,
    jpeg_quality: u8,
}

impl std::fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transcoder")
            .field("engine", &self.engine.name())
            .field("jpeg_quality", &self.jpeg_quality)
            .finish()
    }
}

impl Transcoder {
    #[must_use]
    pub fn new(engine: Arc<dyn VideoEngine>, jpeg_quality: u8) -> Self {
        Self {
            engine,
            jpeg_quality,
        }
    }

    /// Convert a fetched candidate. Consumes it; the input store is dropped
    /// (and its file removed) before this returns.
    pub async fn run(&self, candidate: MediaCandidate) -> Result<Converted> {
        let profile = candidate.profile().ok_or(Error::Unresolved)?;
        let MediaCandidate { input, output, .. } = candidate;

        let output = match &profile.params {
            TranscodeParams::Image => self.image(input, output).await?,
            TranscodeParams::Video(params) => self.video(input, output, params).await?,
        };

        debug!(kind = %profile.kind, bytes = output.len(), "transcoded");
        Ok(Converted {
            kind: profile.kind,
            output,
        })
    }

    async fn image(&self, mut input: ByteStore, mut output: ByteStore) -> Result<ByteStore> {
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || {
            image_ops::convert_to_jpeg(&mut input, &mut output, quality)?;
            Ok::<_, Error>(output)
        })
        .await?
    }

    async fn video(
        &self,
        mut input: ByteStore,
        mut output: ByteStore,
        params: &VideoParams,
    ) -> Result<ByteStore> {
        let input_path = input.persist_to_disk()?;
        output.set_suffix(params.output_suffix);
        let output_path = output.persist_to_disk()?;

        self.engine
            .transcode(&input_path, &output_path, params)
            .await?;
        drop(input);

        output.adopt_external_write()?;
        if output.is_empty() {
            return Err(Error::engine(format!(
                "{} produced no output",
                self.engine.name()
            )));
        }
        Ok(output)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{resolve::Resolver, store::StoreLimits},
        async_trait::async_trait,
        image::{DynamicImage, ImageFormat, RgbImage},
        std::{io::Cursor, path::Path},
    };

    /// Copies input to output, or writes nothing when `empty` is set.
    struct CopyEngine {
        empty: bool,
    }

    #[async_trait]
    impl VideoEngine for CopyEngine {
        fn name(&self) -> &'static str {
            "copy"
        }

        async fn transcode(&self, input: &Path, output: &Path, _: &VideoParams) -> Result<()> {
            if !self.empty {
                tokio::fs::copy(input, output).await?;
            }
            Ok(())
        }
    }

    async fn fetched(url: &str, body: &[u8]) -> MediaCandidate {
        let mut candidate = MediaCandidate::new(url, StoreLimits::default());
        candidate.resolve(&Resolver::new(vec![Box::new(crate::resolve::ExtensionHint)]))
            .await
            .unwrap();
        candidate.input.write_chunk(body).unwrap();
        candidate.input.rewind().unwrap();
        candidate
    }

    fn transcoder(empty: bool) -> Transcoder {
        Transcoder::new(Arc::new(CopyEngine { empty }), 85)
    }

    #[tokio::test]
    async fn image_candidates_become_jpeg() {
        let mut webp = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
            .write_to(&mut webp, ImageFormat::WebP)
            .unwrap();
        let candidate = fetched("https://x.test/a.webp", webp.get_ref()).await;

        let converted = transcoder(false).run(candidate).await.unwrap();
        assert_eq!(converted.kind, MediaKind::Image);
        let bytes = converted.output.into_bytes().unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn video_candidates_go_through_the_engine() {
        let candidate = fetched("https://x.test/clip.webm", b"fake webm").await;
        let converted = transcoder(false).run(candidate).await.unwrap();
        assert_eq!(converted.kind, MediaKind::Video);
        assert!(converted.output.path().unwrap().to_string_lossy().ends_with(".mp4"));
        assert_eq!(converted.output.into_bytes().unwrap(), b"fake webm");
    }

    #[tokio::test]
    async fn empty_engine_output_is_an_error() {
        let candidate = fetched("https://x.test/clip.webm", b"fake webm").await;
        let err = transcoder(true).run(candidate).await.unwrap_err();
        assert!(matches!(err, Error::Engine { .. }), "{err}");
    }

    #[tokio::test]
    async fn unresolved_candidates_are_rejected() {
        let candidate = MediaCandidate::new("https://x.test/a.webp", StoreLimits::default());
        assert!(matches!(
            transcoder(false).run(candidate).await,
            Err(Error::Unresolved)
        ));
    }
}
