//! Media type resolution.
//!
//! A [`Resolver`] runs an ordered list of [`Classifier`]s; the first one that
//! matches decides the candidate's profile. If every classifier passes the
//! candidate is unsupported, which is a normal outcome and not an error.

use {
    async_trait::async_trait,
    reqwest::header::CONTENT_TYPE,
    tracing::{debug, trace},
};

use crate::{
    Error, Result,
    http::{MediaClient, parse_url},
    profile::{self, ConversionProfile},
};

/// Verdict of a single classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Matched(&'static ConversionProfile),
    Pass,
}

/// One step of the resolution chain.
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(&self, url: &str) -> Result<Classification>;
}

/// Filename hint: matches when the URL contains a registered extension.
/// Never touches the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionHint;

#[async_trait]
impl Classifier for ExtensionHint {
    fn name(&self) -> &'static str {
        "extension-hint"
    }

    async fn classify(&self, url: &str) -> Result<Classification> {
        Ok(profile::by_extension_hint(url).map_or(Classification::Pass, Classification::Matched))
    }
}

/// HEAD probe: matches on the exact `content-type` the server reports.
#[derive(Debug, Clone)]
pub struct ContentTypeProbe {
    client: MediaClient,
}

impl ContentTypeProbe {
    #[must_use]
    pub fn new(client: MediaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Classifier for ContentTypeProbe {
    fn name(&self) -> &'static str {
        "content-type-probe"
    }

    async fn classify(&self, url: &str) -> Result<Classification> {
        let parsed = parse_url(url)?;
        let response = self
            .client
            .head(&parsed)
            .await
            .map_err(|source| Error::Resolve {
                url: url.to_string(),
                source,
            })?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        trace!(url, ?content_type, "probe answered");

        Ok(content_type
            .and_then(profile::by_mime_type)
            .map_or(Classification::Pass, Classification::Matched))
    }
}

pub struct Resolver {
    classifiers: Vec<Box<dyn Classifier>>,
}

impl Resolver {
    #[must_use]
    pub fn new(classifiers: Vec<Box<dyn Classifier>>) -> Self {
        Self { classifiers }
    }

    /// Filename hint first, then a HEAD probe.
    #[must_use]
    pub fn standard(client: MediaClient) -> Self {
        Self::new(vec![
            Box::new(ExtensionHint),
            Box::new(ContentTypeProbe::new(client)),
        ])
    }

    /// Append a classifier to the end of the chain.
    pub fn push(&mut self, classifier: impl Classifier + 'static) {
        self.classifiers.push(Box::new(classifier));
    }

    /// Profile for `url`, or `None` when no classifier recognises it.
    pub async fn resolve(&self, url: &str) -> Result<Option<&'static ConversionProfile>> {
        for classifier in &self.classifiers {
            if let Classification::Matched(profile) = classifier.classify(url).await? {
                debug!(
                    url,
                    classifier = classifier.name(),
                    discriminator = %profile.discriminator,
                    kind = %profile.kind,
                    "media type resolved"
                );
                return Ok(Some(profile));
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.classifiers.iter().map(|c| c.name()).collect();
        f.debug_struct("Resolver").field("classifiers", &names).finish()
    }
}
