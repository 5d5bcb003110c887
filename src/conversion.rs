//! Internal conversion helpers.
//!
//! Timestamp rescaling between seconds, stream time bases, and FFmpeg's
//! `AV_TIME_BASE`, plus pixel-data packing for decoded frames.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// FFmpeg's internal time base in ticks per second (`AV_TIME_BASE`).
const AV_TIME_BASE: f64 = 1_000_000.0;

/// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × bpp).
/// The result can be passed directly to [`image::RgbImage::from_raw`] when
/// `bytes_per_pixel` is 3.
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    pack_rows(
        video_frame.data(0),
        video_frame.stride(0),
        width as usize * bytes_per_pixel,
        height as usize,
    )
}

fn pack_rows(data: &[u8], stride: usize, row_bytes: usize, rows: usize) -> Vec<u8> {
    if stride == row_bytes {
        return data[..row_bytes * rows].to_vec();
    }

    let mut buffer = Vec::with_capacity(row_bytes * rows);
    for row in 0..rows {
        let row_start = row * stride;
        buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    buffer
}

/// Convert a [`Duration`] to a timestamp in the stream's time base.
///
/// Rounds down, so a frame whose PTS equals the result is never later than
/// `duration`.
pub(crate) fn duration_to_stream_timestamp(duration: Duration, time_base: Rational) -> i64 {
    let seconds = duration.as_secs_f64();
    let numerator = f64::from(time_base.numerator());
    let denominator = f64::from(time_base.denominator());
    (seconds * denominator / numerator).floor() as i64
}

/// Stream timestamp of `timestamp` measured from a stream that starts at
/// `start_offset`. Saturates instead of overflowing for huge timestamps.
pub(crate) fn presentation_target(
    start_offset: i64,
    timestamp: Duration,
    time_base: Rational,
) -> i64 {
    start_offset.saturating_add(duration_to_stream_timestamp(timestamp, time_base))
}

/// Length of a stream from its `duration` field, if it reports a usable one.
pub(crate) fn stream_duration(duration: i64, time_base: Rational) -> Option<Duration> {
    if duration <= 0 || time_base.denominator() == 0 {
        return None;
    }
    Duration::try_from_secs_f64(pts_to_seconds(duration, time_base))
        .ok()
        .filter(|duration| !duration.is_zero())
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * f64::from(time_base.numerator()) / f64::from(time_base.denominator())
}

/// Rescale a stream timestamp to a container seek target in `AV_TIME_BASE`.
///
/// `input_context.seek()` (via `avformat_seek_file` with `stream_index = -1`)
/// expects microseconds regardless of the stream's own time base.
pub(crate) fn stream_timestamp_to_seek_timestamp(pts: i64, time_base: Rational) -> i64 {
    (pts_to_seconds(pts, time_base) * AV_TIME_BASE) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_timestamp_uses_time_base() {
        let mp4_base = Rational::new(1, 15_360);
        assert_eq!(
            duration_to_stream_timestamp(Duration::from_millis(5500), mp4_base),
            84_480
        );

        let ntsc_base = Rational::new(1001, 30_000);
        assert_eq!(
            duration_to_stream_timestamp(Duration::from_secs(1), ntsc_base),
            29
        );
    }

    #[test]
    fn pts_round_trips_to_seconds() {
        let base = Rational::new(1, 90_000);
        assert!((pts_to_seconds(450_000, base) - 5.0).abs() < f64::EPSILON);
        assert_eq!(stream_timestamp_to_seek_timestamp(450_000, base), 5_000_000);
    }

    #[test]
    fn presentation_target_saturates() {
        let base = Rational::new(1, 12_800);
        assert_eq!(
            presentation_target(1_024, Duration::from_secs(4), base),
            1_024 + 51_200
        );
        assert_eq!(presentation_target(1_024, Duration::MAX, base), i64::MAX);
    }

    #[test]
    fn stream_duration_ignores_missing_values() {
        let base = Rational::new(1, 12_800);
        assert_eq!(stream_duration(64_000, base), Some(Duration::from_secs(5)));
        assert_eq!(stream_duration(0, base), None);
        assert_eq!(stream_duration(i64::MIN, base), None);
    }

    #[test]
    fn pack_rows_strips_padding() {
        // Two rows of 2 RGB pixels with 2 bytes of padding each.
        let data = [1, 2, 3, 4, 5, 6, 0, 0, 7, 8, 9, 10, 11, 12, 0, 0];
        assert_eq!(
            pack_rows(&data, 8, 6, 2),
            vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
        );
    }

    #[test]
    fn pack_rows_fast_path() {
        let data = [1, 2, 3, 4, 5, 6];
        assert_eq!(pack_rows(&data, 3, 3, 2), data.to_vec());
    }
}
