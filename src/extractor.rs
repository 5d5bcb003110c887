//! End-to-end frame extraction.
//!
//! [`FrameExtractor`] runs one request through validate → fetch → decode →
//! encode. The downloaded file is owned by the pipeline and removed on every
//! exit path: an early error drops it, an abandoned request drops the
//! in-flight fetch, and once decoding starts the blocking task owns it until
//! it finishes.
//!
//! Fetching and decoding sit behind the [`VideoFetcher`] and [`FrameDecoder`]
//! traits so each can be replaced independently.

use std::{path::Path, sync::Arc, time::Duration};

use image::DynamicImage;

use crate::{
    configuration::ServiceOptions,
    error::{DecodeError, ExtractorError},
    fetch::{HttpFetcher, VideoFetcher},
    frame::ExtractedFrame,
    media::MediaFile,
    request::ExtractionRequest,
};

/// Turns a local video file into the frame at a presentation time.
///
/// Called on a blocking thread.
pub trait FrameDecoder: Send + Sync + 'static {
    /// Decode the frame nearest at or after `timestamp`.
    fn decode_frame(&self, path: &Path, timestamp: Duration) -> Result<DynamicImage, DecodeError>;
}

/// [`FrameDecoder`] backed by FFmpeg.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegDecoder;

impl FrameDecoder for FfmpegDecoder {
    fn decode_frame(&self, path: &Path, timestamp: Duration) -> Result<DynamicImage, DecodeError> {
        let mut media = MediaFile::open(path)?;
        media.video()?.frame_at(timestamp)
    }
}

/// The frame extraction pipeline.
///
/// Holds no per-request state, so one instance serves concurrent requests.
///
/// # Example
///
/// ```no_run
/// use framegrab::{FrameExtractor, ServiceOptions};
///
/// # async fn example() -> Result<(), framegrab::ExtractorError> {
/// let extractor = FrameExtractor::from_options(&ServiceOptions::new())?;
/// let frame = extractor
///     .extract_frame("https://example.com/sample.mp4", 5.5)
///     .await?;
/// std::fs::write("frame.png", frame.bytes())?;
/// # Ok(())
/// # }
/// ```
pub struct FrameExtractor<F = HttpFetcher, D = FfmpegDecoder> {
    fetcher: F,
    decoder: Arc<D>,
}

impl FrameExtractor<HttpFetcher, FfmpegDecoder> {
    /// Build the default HTTP + FFmpeg pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::Fetch`] if the HTTP client cannot be built.
    pub fn from_options(options: &ServiceOptions) -> Result<Self, ExtractorError> {
        Ok(Self::new(HttpFetcher::new(options)?, FfmpegDecoder))
    }
}

impl<F: VideoFetcher, D: FrameDecoder> FrameExtractor<F, D> {
    /// Assemble a pipeline from its parts.
    pub fn new(fetcher: F, decoder: D) -> Self {
        Self {
            fetcher,
            decoder: Arc::new(decoder),
        }
    }

    /// Validate the inputs and extract the frame as PNG.
    ///
    /// # Errors
    ///
    /// - [`ExtractorError::Validation`] for a bad URL or time. Nothing is
    ///   fetched.
    /// - Any error from [`extract`](FrameExtractor::extract).
    pub async fn extract_frame(
        &self,
        video_url: &str,
        time: f64,
    ) -> Result<ExtractedFrame, ExtractorError> {
        let request = ExtractionRequest::new(video_url, time)?;
        self.extract(&request).await
    }

    /// Extract the frame for an already validated request.
    ///
    /// # Errors
    ///
    /// - [`ExtractorError::Fetch`] if the download fails.
    /// - [`ExtractorError::Decode`] if the video cannot be opened or the time
    ///   is out of range.
    /// - [`ExtractorError::Image`] if PNG encoding fails.
    /// - [`ExtractorError::Task`] if the decode task panics.
    pub async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractedFrame, ExtractorError> {
        log::info!(
            "Extracting frame at {:.3}s from {}",
            request.time.as_secs_f64(),
            request.video_url
        );

        let video = self.fetcher.fetch(&request.video_url).await?;
        let decoder = Arc::clone(&self.decoder);
        let timestamp = request.time;

        tokio::task::spawn_blocking(move || {
            let result = decoder
                .decode_frame(video.path(), timestamp)
                .map_err(ExtractorError::from)
                .and_then(|image| ExtractedFrame::encode_png(&image));

            if let Err(error) = video.close() {
                log::warn!("Failed to remove temporary video: {error}");
            }
            result
        })
        .await
        .map_err(|error| ExtractorError::Task(error.to_string()))?
    }
}
