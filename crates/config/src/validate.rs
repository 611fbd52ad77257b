//! Semantic checks on a loaded configuration.
//!
//! Parsing already rejects malformed files; this catches values that parse
//! fine but would make the pipeline misbehave.

use crate::schema::Webp2uConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "range", "credentials", "limits"
    pub category: &'static str,
    /// Dotted path, e.g. "media.max_bytes"
    pub path: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(
        &mut self,
        severity: Severity,
        category: &'static str,
        path: &'static str,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            category,
            path,
            message: message.into(),
        });
    }
}

/// Validate a configuration and collect every problem found.
#[must_use]
pub fn validate(config: &Webp2uConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let media = &config.media;

    let must_be_positive = [
        ("media.max_concurrency", media.max_concurrency as u64),
        ("media.max_bytes", media.max_bytes),
        ("media.request_timeout_secs", media.request_timeout_secs),
        ("media.chunk_size", media.chunk_size as u64),
        ("media.ffmpeg.timeout_secs", media.ffmpeg.timeout_secs),
    ];
    for (path, value) in must_be_positive {
        if value == 0 {
            result.push(Severity::Error, "range", path, "must be greater than zero");
        }
    }

    if !(1..=100).contains(&media.jpeg_quality) {
        result.push(
            Severity::Error,
            "range",
            "media.jpeg_quality",
            format!("{} is outside 1..=100", media.jpeg_quality),
        );
    }

    if media.spill_threshold_bytes as u64 > media.max_bytes {
        result.push(
            Severity::Warning,
            "limits",
            "media.spill_threshold_bytes",
            "larger than media.max_bytes; payloads will never spill to disk",
        );
    }

    if !config.telegram.has_token() {
        result.push(
            Severity::Warning,
            "credentials",
            "telegram.token",
            format!(
                "no bot token configured; set {} to run the bot",
                crate::TOKEN_ENV_VAR
            ),
        );
    }

    result
}
