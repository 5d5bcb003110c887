//! Video download.
//!
//! [`VideoFetcher`] turns a URL into a [`TempVideo`]: a scoped temporary file
//! that is removed when it is dropped. [`HttpFetcher`] is the `reqwest`
//! implementation used by the server; it enforces the configured size limit
//! and timeout while streaming the body to disk.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    io::{Error as IoError, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use reqwest::Client;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::{configuration::ServiceOptions, error::FetchError};

/// Suffix used when the URL path carries no usable extension.
const DEFAULT_SUFFIX: &str = ".mp4";

/// Connection establishment timeout, separate from the overall fetch timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of video content for a request.
///
/// Implementations must not leave anything on disk once the returned
/// [`TempVideo`] is dropped.
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    /// Download `url` into a temporary file.
    async fn fetch(&self, url: &Url) -> Result<TempVideo, FetchError>;
}

/// A downloaded video stored in a temporary file.
///
/// The file is deleted when this value is dropped or [`closed`](TempVideo::close).
pub struct TempVideo {
    file: NamedTempFile,
    len: u64,
}

impl Debug for TempVideo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("TempVideo")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl TempVideo {
    /// Create an empty temporary file in `dir` (or the system temp dir).
    ///
    /// `suffix` should include the leading dot, e.g. `".webm"`. FFmpeg uses it
    /// as a hint when probing the container.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn create(dir: Option<&Path>, suffix: &str) -> Result<Self, IoError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("framegrab-").suffix(suffix);
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(Self { file, len: 0 })
    }

    /// Create a temporary file holding `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created or written.
    pub fn from_bytes(dir: Option<&Path>, suffix: &str, bytes: &[u8]) -> Result<Self, IoError> {
        let mut video = Self::create(dir, suffix)?;
        video.file.write_all(bytes)?;
        video.file.flush()?;
        video.len = bytes.len() as u64;
        Ok(video)
    }

    /// Location of the temporary file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of bytes downloaded.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if nothing was downloaded.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Delete the file now, reporting any failure.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file could not be removed.
    pub fn close(self) -> Result<(), IoError> {
        self.file.close()
    }
}

/// Downloads videos over HTTP(S) with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_video_bytes: u64,
    fetch_timeout: Duration,
    temp_dir: Option<PathBuf>,
}

impl HttpFetcher {
    /// Build a fetcher from service options.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built
    /// (e.g. no TLS backend).
    pub fn new(options: &ServiceOptions) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(options.fetch_timeout())
            .build()
            .map_err(|error| FetchError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            max_video_bytes: options.max_video_bytes(),
            fetch_timeout: options.fetch_timeout(),
            temp_dir: options.temp_dir().map(Path::to_path_buf),
        })
    }

    fn map_error(&self, error: reqwest::Error) -> FetchError {
        if error.is_timeout() {
            FetchError::Timeout(self.fetch_timeout)
        } else {
            error.into()
        }
    }
}

#[async_trait]
impl VideoFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<TempVideo, FetchError> {
        log::debug!("Fetching video from {url}");

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|error| self.map_error(error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        if response
            .content_length()
            .is_some_and(|length| length > self.max_video_bytes)
        {
            return Err(FetchError::TooLarge {
                limit: self.max_video_bytes,
            });
        }

        // From here on, every early return drops `video` and removes the file.
        let mut video = TempVideo::create(self.temp_dir.as_deref(), &suffix_for(url))?;
        let mut writer = tokio::fs::File::from_std(video.file.as_file().try_clone()?);
        let mut written: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|error| self.map_error(error))?
        {
            written += chunk.len() as u64;
            if written > self.max_video_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_video_bytes,
                });
            }
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;
        video.len = written;

        log::info!("Downloaded {written} bytes from {url}");
        Ok(video)
    }
}

/// Temporary-file suffix derived from the URL path's extension.
fn suffix_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| Path::new(name).extension())
        .and_then(|extension| extension.to_str())
        .filter(|extension| {
            (1..=5).contains(&extension.len())
                && extension.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|extension| format!(".{}", extension.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_SUFFIX.to_string())
}
