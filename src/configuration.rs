//! Service configuration.
//!
//! [`ServiceOptions`] is a builder that threads the listening address,
//! download limits, and timeouts through the server and the fetcher without
//! polluting every function signature.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use framegrab::ServiceOptions;
//!
//! let options = ServiceOptions::new()
//!     .with_port(9000)
//!     .with_max_video_bytes(64 * 1024 * 1024)
//!     .with_fetch_timeout(Duration::from_secs(30));
//! assert_eq!(options.socket_addr().port(), 9000);
//! ```

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

/// Port used when `PORT` is not set.
pub const DEFAULT_PORT: u16 = 8000;

/// Largest video the fetcher will download, in bytes (500 MiB).
pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 500 * 1024 * 1024;

/// Upper bound on a single video download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Upper bound on a whole request, download and decode included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for the frame extraction service.
///
/// All fields have sensible defaults; a default-constructed value listens on
/// `0.0.0.0:8000`.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub(crate) host: IpAddr,
    pub(crate) port: u16,
    pub(crate) max_video_bytes: u64,
    pub(crate) fetch_timeout: Duration,
    pub(crate) request_timeout: Duration,
    /// Directory for downloaded videos. `None` uses the system temp dir.
    pub(crate) temp_dir: Option<PathBuf>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_video_bytes: DEFAULT_MAX_VIDEO_BYTES,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            temp_dir: None,
        }
    }

    /// Set the address to bind to.
    #[must_use]
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Set the listening port. `0` lets the OS pick one.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the maximum video size in bytes. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_max_video_bytes(mut self, bytes: u64) -> Self {
        self.max_video_bytes = bytes.max(1);
        self
    }

    /// Set the timeout for downloading a video.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the timeout for handling a whole request.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Store downloaded videos in `dir` instead of the system temp dir.
    #[must_use]
    pub fn with_temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// The socket address the server binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Maximum video size in bytes.
    pub fn max_video_bytes(&self) -> u64 {
        self.max_video_bytes
    }

    /// Timeout for a single download.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    /// Timeout for a whole request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Directory used for downloaded videos, if overridden.
    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }
}
