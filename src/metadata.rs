//! Media metadata types.
//!
//! This module defines the metadata returned by
//! [`MediaFile::metadata`](crate::MediaFile::metadata). Metadata is read once
//! when the decoding session opens and cached for its lifetime.

use std::time::Duration;

/// Container-level metadata plus the selected video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct MediaMetadata {
    /// Best video stream, if the container has one.
    pub video: Option<VideoMetadata>,
    /// Total duration. [`Duration::ZERO`] when the container does not report one.
    pub duration: Duration,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
}

/// Metadata for a video stream.
#[derive(Debug, Clone)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second (approximate for variable frame rate).
    pub frames_per_second: f64,
    /// Length of the video stream itself. Falls back to the container
    /// duration when the stream does not report one, so it can be shorter
    /// than [`MediaMetadata::duration`] when another track runs longer.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
    /// Index of the stream within the container.
    pub stream_index: usize,
}
