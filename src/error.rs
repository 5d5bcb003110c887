//! Error types for the `framegrab` crate.
//!
//! This module defines [`ExtractorError`], the unified error type returned by
//! every fallible operation in the crate, together with the three request
//! failure families it wraps:
//!
//! - [`ValidationErrors`]: the request body was malformed or out of range.
//! - [`FetchError`]: the video could not be downloaded.
//! - [`DecodeError`]: the downloaded content could not be opened or did not
//!   contain a frame at the requested time.
//!
//! Messages are written for API callers. They never include local file-system
//! paths (the temporary download location is an implementation detail).

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::Error as IoError,
    time::Duration,
};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde::Serialize;
use thiserror::Error;

/// The unified error type for all `framegrab` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractorError {
    /// The request failed field-level validation. No work was started.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationErrors),

    /// The request body exceeded the accepted size. No work was started.
    #[error("request body exceeds the limit of {limit} bytes")]
    BodyTooLarge {
        /// Accepted maximum in bytes.
        limit: usize,
    },

    /// The video could not be downloaded.
    #[error("Failed to download video: {0}")]
    Fetch(#[from] FetchError),

    /// The video could not be decoded at the requested time.
    #[error("Failed to extract frame: {0}")]
    Decode(#[from] DecodeError),

    /// A local I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The decoded frame could not be encoded as PNG.
    #[error("Image encoding error: {0}")]
    Image(#[from] ImageError),

    /// The blocking decode task was cancelled or panicked.
    #[error("Frame extraction task failed: {0}")]
    Task(String),
}

impl From<FfmpegError> for ExtractorError {
    fn from(error: FfmpegError) -> Self {
        ExtractorError::Decode(DecodeError::from(error))
    }
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending field (`"video_url"`, `"time"`, or `"body"`).
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

impl FieldError {
    pub(crate) fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every field-level problem found in a request.
///
/// Validation does not stop at the first failure, so a caller that sent both
/// a bad URL and a negative time learns about both at once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Error)]
pub struct ValidationErrors {
    /// Failures in the order the fields were checked.
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub(crate) fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError::new(field, message));
    }

    /// Returns `true` if no field failed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `true` if `field` is among the failures.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|error| error.field == field)
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self {
            fields: vec![error],
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (index, error) in self.fields.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// Failures while downloading the video.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The remote server answered with a non-success status.
    #[error("server responded with HTTP {status}")]
    Status {
        /// HTTP status code returned by the remote server.
        status: u16,
    },

    /// The download did not finish within the configured fetch timeout.
    #[error("download timed out after {0:?}")]
    Timeout(Duration),

    /// The video is larger than the configured limit.
    #[error("video exceeds the maximum allowed size of {limit} bytes")]
    TooLarge {
        /// Configured maximum in bytes.
        limit: u64,
    },

    /// Connection, TLS, or protocol failure.
    #[error("{0}")]
    Transport(String),

    /// Writing the downloaded bytes to the temporary file failed.
    #[error("could not store downloaded video: {0}")]
    Io(#[from] IoError),
}

impl From<reqwest::Error> for FetchError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            return FetchError::Status {
                status: status.as_u16(),
            };
        }
        // reqwest includes the URL, which the caller supplied, so it is safe
        // to echo back.
        FetchError::Transport(error.to_string())
    }
}

/// Failures while opening the video or locating the requested frame.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The downloaded content could not be opened as media.
    #[error("could not open video: {0}")]
    Open(String),

    /// The media contains no video stream.
    #[error("no video stream found")]
    NoVideoStream,

    /// The requested time is at or beyond the end of the video.
    #[error(
        "time {:.3}s is beyond the video duration of {:.3}s",
        requested.as_secs_f64(),
        duration.as_secs_f64()
    )]
    TimestampOutOfRange {
        /// The requested presentation time.
        requested: Duration,
        /// The container duration.
        duration: Duration,
    },

    /// Decoding reached the end of the stream without producing a frame at or
    /// after the requested time.
    #[error("no frame found at or after {:.3}s", requested.as_secs_f64())]
    FrameNotFound {
        /// The requested presentation time.
        requested: Duration,
    },

    /// An error reported by FFmpeg while decoding.
    #[error("decoder error: {0}")]
    Ffmpeg(String),
}

impl From<FfmpegError> for DecodeError {
    fn from(error: FfmpegError) -> Self {
        DecodeError::Ffmpeg(error.to_string())
    }
}
