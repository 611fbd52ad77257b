//! Media resolution and conversion pipeline.
//!
//! Links found in a chat message are classified (filename hint, then a HEAD
//! probe), streamed into bounded temporary stores, converted into formats
//! every chat client renders (JPEG stills, H.264 mp4 video) and handed to a
//! [`MediaSink`] for delivery.

pub mod candidate;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod http;
pub mod image_ops;
pub mod pipeline;
pub mod profile;
pub mod resolve;
pub mod sink;
pub mod store;
pub mod transcode;
pub mod video;

pub use {
    candidate::{MediaCandidate, Resolution},
    error::{Error, Result},
    extract::extract_urls,
    pipeline::{CandidateReport, Outcome, Pipeline},
    profile::{ConversionProfile, MediaKind},
    sink::{MediaSink, ReplyTarget},
    store::{ByteStore, StoreLimits},
    video::{FfmpegEngine, VideoEngine},
};
