//! Video frame extraction.
//!
//! [`VideoHandle`] locates the frame on screen at a presentation time and
//! returns it as an RGB8 [`DynamicImage`].

use std::time::Duration;

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::{
    conversion::{
        duration_to_stream_timestamp, frame_to_buffer, presentation_target,
        stream_timestamp_to_seek_timestamp,
    },
    error::DecodeError,
    media::MediaFile,
    metadata::VideoMetadata,
};

/// FFmpeg's `AV_NOPTS_VALUE`.
const NO_PTS: i64 = i64::MIN;

/// Frame extraction on the best video stream of a [`MediaFile`].
///
/// Obtained via [`MediaFile::video`]. Each extraction builds a fresh decoder,
/// seeks, and decodes forward. The decoder is dropped when the method
/// returns.
#[derive(Debug)]
pub struct VideoHandle<'a> {
    pub(crate) media: &'a mut MediaFile,
    pub(crate) video: VideoMetadata,
}

impl VideoHandle<'_> {
    /// Extract the frame whose presentation time is the nearest at or after
    /// `timestamp`.
    ///
    /// Seeks to the nearest keyframe at or before the target and decodes
    /// forward. If the stream ends first, the last decoded frame is returned
    /// only when `timestamp` falls within one frame interval of it, since it is
    /// still on screen then. Nothing is clamped beyond that.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::TimestampOutOfRange`] if `timestamp` is at or beyond
    ///   the video stream's duration.
    /// - [`DecodeError::FrameNotFound`] if no suitable frame was decoded.
    /// - [`DecodeError::Ffmpeg`] if decoding or pixel conversion fails.
    pub fn frame_at(&mut self, timestamp: Duration) -> Result<DynamicImage, DecodeError> {
        let duration = self.video.duration;
        if !duration.is_zero() && timestamp >= duration {
            return Err(DecodeError::TimestampOutOfRange {
                requested: timestamp,
                duration,
            });
        }

        let stream_index = self.video.stream_index;
        let stream = self
            .media
            .input_context
            .stream(stream_index)
            .ok_or(DecodeError::NoVideoStream)?;
        let time_base = stream.time_base();
        let start_offset = match stream.start_time() {
            NO_PTS => 0,
            start => start,
        };
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context.decoder().video()?;

        let width = self.video.width;
        let height = self.video.height;
        let mut scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let target_pts = presentation_target(start_offset, timestamp, time_base);
        let seek_target = stream_timestamp_to_seek_timestamp(target_pts, time_base);
        let frame_interval = frame_interval(self.video.frames_per_second, time_base);

        // A failed seek leaves the demuxer at the start, which still works.
        if let Err(error) = self.media.input_context.seek(seek_target, ..seek_target) {
            log::warn!("Seek to {timestamp:?} failed, decoding from start: {error}");
        }

        log::debug!(
            "Decoding stream {stream_index} towards pts {target_pts} (time base {}/{})",
            time_base.numerator(),
            time_base.denominator(),
        );

        let mut decoded_frame = VideoFrame::empty();
        let mut last_frame: Option<(i64, VideoFrame)> = None;

        for (stream, packet) in self.media.input_context.packets() {
            if stream.index() != stream_index {
                continue;
            }

            if let Err(error) = decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {error}");
                continue;
            }

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = presentation_timestamp(&decoded_frame);
                if pts >= target_pts {
                    return convert_frame(&mut scaler, &decoded_frame, width, height);
                }
                last_frame = Some((pts, decoded_frame.clone()));
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            let pts = presentation_timestamp(&decoded_frame);
            if pts >= target_pts {
                return convert_frame(&mut scaler, &decoded_frame, width, height);
            }
            last_frame = Some((pts, decoded_frame.clone()));
        }

        match last_frame {
            Some((pts, frame)) if still_displayed(pts, target_pts, frame_interval) => {
                log::debug!("Stream ended before {timestamp:?}, using the last decoded frame");
                convert_frame(&mut scaler, &frame, width, height)
            }
            _ => Err(DecodeError::FrameNotFound {
                requested: timestamp,
            }),
        }
    }
}

/// Display time of one frame in stream time base units, or `None` when the
/// frame rate is unknown.
fn frame_interval(frames_per_second: f64, time_base: Rational) -> Option<i64> {
    if !frames_per_second.is_finite() || frames_per_second <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / frames_per_second)
        .ok()
        .map(|interval| duration_to_stream_timestamp(interval, time_base))
        .filter(|interval| *interval > 0)
}

/// Whether a frame presented at `frame_pts` is still on screen at
/// `target_pts`.
fn still_displayed(frame_pts: i64, target_pts: i64, frame_interval: Option<i64>) -> bool {
    frame_pts != NO_PTS
        && frame_interval.is_some_and(|interval| target_pts.saturating_sub(frame_pts) <= interval)
}

/// Best-effort presentation timestamp of a decoded frame.
///
/// Frames with no timestamp at all sort first so they never satisfy a
/// target.
fn presentation_timestamp(frame: &VideoFrame) -> i64 {
    frame.timestamp().or_else(|| frame.pts()).unwrap_or(NO_PTS)
}

fn convert_frame(
    scaler: &mut ScalingContext,
    frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, DecodeError> {
    let mut rgb_frame = VideoFrame::empty();
    scaler.run(frame, &mut rgb_frame)?;

    let buffer = frame_to_buffer(&rgb_frame, width, height, 3);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        DecodeError::Ffmpeg("decoded frame does not match the stream dimensions".to_string())
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_interval_follows_frame_rate() {
        let base = Rational::new(1, 12_800);
        assert_eq!(frame_interval(25.0, base), Some(512));
        assert_eq!(frame_interval(0.0, base), None);
        assert_eq!(frame_interval(f64::NAN, base), None);
    }

    #[test]
    fn last_frame_only_covers_one_interval() {
        // Last frame of a 5 s, 25 fps clip at 1/12800.
        let last_pts = 63_488;
        let interval = Some(512);

        assert!(still_displayed(last_pts, 63_872, interval));
        assert!(still_displayed(last_pts, last_pts + 512, interval));
        assert!(!still_displayed(last_pts, 89_600, interval));
        assert!(!still_displayed(last_pts, 63_872, None));
        assert!(!still_displayed(NO_PTS, 63_872, interval));
    }
}
