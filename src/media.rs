//! Decoding session.
//!
//! [`MediaFile`] opens a local media file with FFmpeg, selects the best video
//! stream, and caches its metadata. Dropping it closes the demuxer.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::Path,
    time::Duration,
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};

use crate::{
    conversion::stream_duration,
    error::DecodeError,
    metadata::{MediaMetadata, VideoMetadata},
    video::VideoHandle,
};

/// An opened media file.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use framegrab::MediaFile;
///
/// let mut media = MediaFile::open("input.mp4")?;
/// println!("Duration: {:?}", media.metadata().duration);
/// let frame = media.video()?.frame_at(Duration::from_secs(5))?;
/// # Ok::<(), framegrab::DecodeError>(())
/// ```
pub struct MediaFile {
    /// The opened FFmpeg input (demuxer) context.
    pub(crate) input_context: Input,
    /// Cached metadata extracted at open time.
    pub(crate) metadata: MediaMetadata,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a media file.
    ///
    /// Initializes FFmpeg (idempotent), opens the file, and reads the
    /// container duration and best video stream.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Open`] if the file cannot be opened or its
    /// video codec parameters cannot be read. The message never contains the
    /// path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        log::debug!("Opening media file: {}", path.display());

        ffmpeg_next::init()
            .map_err(|error| DecodeError::Open(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| DecodeError::Open(error.to_string()))?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let format = input_context.format().name().to_string();

        let video = match input_context.streams().best(Type::Video) {
            Some(stream) => {
                let index = stream.index();
                let decoder_context = CodecContext::from_parameters(stream.parameters())
                    .map_err(|error| {
                        DecodeError::Open(format!(
                            "failed to read codec parameters for stream {index}: {error}"
                        ))
                    })?;
                let video_decoder = decoder_context.decoder().video().map_err(|error| {
                    DecodeError::Open(format!(
                        "failed to create video decoder for stream {index}: {error}"
                    ))
                })?;

                let frames_per_second = rational_to_f64(stream.avg_frame_rate())
                    .or_else(|| rational_to_f64(stream.rate()))
                    .unwrap_or(0.0);

                let codec = video_decoder
                    .codec()
                    .map(|codec| codec.name().to_string())
                    .unwrap_or_else(|| "unknown".to_string());

                let video_duration =
                    stream_duration(stream.duration(), stream.time_base()).unwrap_or(duration);

                Some(VideoMetadata {
                    width: video_decoder.width(),
                    height: video_decoder.height(),
                    frames_per_second,
                    duration: video_duration,
                    codec,
                    stream_index: index,
                })
            }
            None => None,
        };

        let metadata = MediaMetadata {
            video,
            duration,
            format,
        };

        log::info!(
            "Opened media (format={}, duration={:.2}s)",
            metadata.format,
            metadata.duration.as_secs_f64(),
        );

        if let Some(video) = &metadata.video {
            log::debug!(
                "Best video stream: index={}, {}x{}, {:.2} fps, {:.2}s, codec={}",
                video.stream_index,
                video.width,
                video.height,
                video.frames_per_second,
                video.duration.as_secs_f64(),
                video.codec,
            );
        }

        Ok(Self {
            input_context,
            metadata,
        })
    }

    /// Cached media metadata.
    pub fn metadata(&self) -> &MediaMetadata {
        &self.metadata
    }

    /// Obtain a [`VideoHandle`] for extracting frames from the best video
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::NoVideoStream`] if the file has no video.
    pub fn video(&mut self) -> Result<VideoHandle<'_>, DecodeError> {
        let video = self
            .metadata
            .video
            .clone()
            .ok_or(DecodeError::NoVideoStream)?;
        Ok(VideoHandle { media: self, video })
    }
}

fn rational_to_f64(rate: ffmpeg_next::Rational) -> Option<f64> {
    (rate.denominator() != 0 && rate.numerator() > 0)
        .then(|| f64::from(rate.numerator()) / f64::from(rate.denominator()))
}
