//! Static conversion profiles keyed by discriminator.
//!
//! A discriminator is either a filename hint found in the URL or a MIME type
//! returned by a probe. Every known discriminator maps to exactly one
//! profile; anything else leaves the candidate unsupported.

use std::fmt;

/// Closed set of media kinds the pipeline knows how to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// How a discriminator is matched against a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discriminator {
    /// Substring of the URL, e.g. `.webp`.
    Extension(&'static str),
    /// Exact `content-type` header value, e.g. `image/webp`.
    MimeType(&'static str),
}

impl Discriminator {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extension(s) | Self::MimeType(s) => s,
        }
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters handed to the video engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoParams {
    /// Output container, passed to ffmpeg as `-f`.
    pub container: &'static str,
    /// Output video codec, passed to ffmpeg as `-c:v`.
    pub video_codec: &'static str,
    /// Output audio codec, passed to ffmpeg as `-c:a`.
    pub audio_codec: &'static str,
    /// Suffix for the temporary output file.
    pub output_suffix: &'static str,
}

/// Transcode target for a profile. Still images always become baseline JPEG,
/// so they carry no parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeParams {
    Image,
    Video(VideoParams),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionProfile {
    pub discriminator: Discriminator,
    pub kind: MediaKind,
    /// Suffix used when the fetched input has to live on disk.
    pub input_suffix: &'static str,
    pub params: TranscodeParams,
}

pub const MP4_H264: VideoParams = VideoParams {
    container: "mp4",
    video_codec: "libx264",
    audio_codec: "aac",
    output_suffix: ".mp4",
};

/// The profile table. Add a media kind by appending entries here.
pub static PROFILES: &[ConversionProfile] = &[
    ConversionProfile {
        discriminator: Discriminator::Extension(".webp"),
        kind: MediaKind::Image,
        input_suffix: ".webp",
        params: TranscodeParams::Image,
    },
    ConversionProfile {
        discriminator: Discriminator::MimeType("image/webp"),
        kind: MediaKind::Image,
        input_suffix: ".webp",
        params: TranscodeParams::Image,
    },
    ConversionProfile {
        discriminator: Discriminator::Extension(".webm"),
        kind: MediaKind::Video,
        input_suffix: ".webm",
        params: TranscodeParams::Video(MP4_H264),
    },
    ConversionProfile {
        discriminator: Discriminator::MimeType("video/webm"),
        kind: MediaKind::Video,
        input_suffix: ".webm",
        params: TranscodeParams::Video(MP4_H264),
    },
];

/// First profile whose extension hint occurs in `url` (ASCII case-insensitive).
#[must_use]
pub fn by_extension_hint(url: &str) -> Option<&'static ConversionProfile> {
    let lowered = url.to_ascii_lowercase();
    PROFILES.iter().find(|p| match p.discriminator {
        Discriminator::Extension(ext) => lowered.contains(ext),
        Discriminator::MimeType(_) => false,
    })
}

/// Profile registered for an exact `content-type` value.
#[must_use]
pub fn by_mime_type(content_type: &str) -> Option<&'static ConversionProfile> {
    PROFILES.iter().find(|p| match p.discriminator {
        Discriminator::MimeType(mime) => mime == content_type,
        Discriminator::Extension(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, std::collections::HashSet};

    #[test]
    fn discriminators_are_unique() {
        let mut seen = HashSet::new();
        for profile in PROFILES {
            assert!(
                seen.insert(profile.discriminator.as_str()),
                "duplicate discriminator {}",
                profile.discriminator
            );
        }
    }

    #[test]
    fn video_profiles_carry_video_params() {
        for profile in PROFILES {
            let is_video_params = matches!(profile.params, TranscodeParams::Video(_));
            assert_eq!(profile.kind == MediaKind::Video, is_video_params);
        }
    }

    #[rstest]
    #[case("https://example.com/cat.webp", Some(MediaKind::Image))]
    #[case("https://example.com/CAT.WEBP?size=large", Some(MediaKind::Image))]
    #[case("https://cdn.example.com/clip.webm", Some(MediaKind::Video))]
    #[case("https://example.com/cat.png", None)]
    #[case("https://example.com/page", None)]
    fn extension_hints(#[case] url: &str, #[case] expected: Option<MediaKind>) {
        assert_eq!(by_extension_hint(url).map(|p| p.kind), expected);
    }

    #[rstest]
    #[case("image/webp", Some(MediaKind::Image))]
    #[case("video/webm", Some(MediaKind::Video))]
    #[case("image/webp; charset=binary", None)]
    #[case("text/html", None)]
    #[case("", None)]
    fn mime_lookup_is_exact(#[case] content_type: &str, #[case] expected: Option<MediaKind>) {
        assert_eq!(by_mime_type(content_type).map(|p| p.kind), expected);
    }
}
