//! A single URL tracked through resolution, fetch and transcode.

use crate::{
    Error, Result,
    profile::{ConversionProfile, Discriminator, MediaKind},
    resolve::Resolver,
    store::{ByteStore, StoreLimits},
};

/// Resolution state. Leaves `Unresolved` exactly once and never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Unresolved,
    Unsupported,
    Supported(&'static ConversionProfile),
}

/// A candidate owns its input and output stores; both are released when the
/// candidate (or whatever it was split into) is dropped.
#[derive(Debug)]
pub struct MediaCandidate {
    url: String,
    resolution: Resolution,
    pub(crate) input: ByteStore,
    pub(crate) output: ByteStore,
}

impl MediaCandidate {
    #[must_use]
    pub fn new(url: impl Into<String>, limits: StoreLimits) -> Self {
        Self {
            url: url.into(),
            resolution: Resolution::Unresolved,
            input: ByteStore::new(limits),
            output: ByteStore::new(limits),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[must_use]
    pub fn profile(&self) -> Option<&'static ConversionProfile> {
        match self.resolution {
            Resolution::Supported(profile) => Some(profile),
            Resolution::Unresolved | Resolution::Unsupported => None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<MediaKind> {
        self.profile().map(|p| p.kind)
    }

    /// The filename hint or MIME type that produced the classification.
    #[must_use]
    pub fn discriminator(&self) -> Option<Discriminator> {
        self.profile().map(|p| p.discriminator)
    }

    /// Classify the candidate.
    ///
    /// Must be called at most once; a second call fails with
    /// [`Error::AlreadyResolved`] without touching the resolver. A failed
    /// attempt leaves the candidate unresolved.
    pub async fn resolve(
        &mut self,
        resolver: &Resolver,
    ) -> Result<Option<&'static ConversionProfile>> {
        if self.resolution != Resolution::Unresolved {
            return Err(Error::AlreadyResolved);
        }
        let profile = resolver.resolve(&self.url).await?;
        if let Some(profile) = profile {
            self.input.set_suffix(profile.input_suffix);
        }
        self.resolution = profile.map_or(Resolution::Unsupported, Resolution::Supported);
        Ok(profile)
    }
}
