//! # framegrab
//!
//! Grab a single still frame from a remote video over HTTP.
//!
//! `framegrab` serves one endpoint, `POST /extract-frame`, that takes a video
//! URL and a time in seconds, downloads the video to a scoped temporary file,
//! seeks with FFmpeg (via [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next))
//! to the nearest frame at or after that time, and answers with the frame as
//! a PNG image.
//!
//! ## Quick Start
//!
//! ### Run the server
//!
//! ```no_run
//! use framegrab::ServiceOptions;
//!
//! # async fn example() -> Result<(), framegrab::ExtractorError> {
//! framegrab::serve(&ServiceOptions::new().with_port(8000)).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Extract a frame in-process
//!
//! ```no_run
//! use framegrab::{FrameExtractor, ServiceOptions};
//!
//! # async fn example() -> Result<(), framegrab::ExtractorError> {
//! let extractor = FrameExtractor::from_options(&ServiceOptions::new())?;
//! let frame = extractor
//!     .extract_frame("https://example.com/sample.mp4", 5.5)
//!     .await?;
//! println!("{}x{} PNG, {} bytes", frame.width(), frame.height(), frame.bytes().len());
//! # Ok(())
//! # }
//! ```
//!
//! ### Decode a local file
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use framegrab::MediaFile;
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! let image = media.video()?.frame_at(Duration::from_millis(5500))?;
//! # Ok::<(), framegrab::DecodeError>(())
//! ```
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on the build machine.

pub mod configuration;
mod conversion;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod ffmpeg;
pub mod frame;
pub mod media;
pub mod metadata;
pub mod request;
pub mod server;
pub mod video;

pub use configuration::ServiceOptions;
pub use error::{DecodeError, ExtractorError, FetchError, FieldError, ValidationErrors};
pub use extractor::{FfmpegDecoder, FrameDecoder, FrameExtractor};
pub use fetch::{HttpFetcher, TempVideo, VideoFetcher};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame::{ExtractedFrame, PNG_CONTENT_TYPE};
pub use media::MediaFile;
pub use metadata::{MediaMetadata, VideoMetadata};
pub use request::ExtractionRequest;
pub use server::{router, serve};
pub use video::VideoHandle;
