use std::{net::IpAddr, path::PathBuf, time::Duration};

use clap::Parser;
use framegrab::{FfmpegLogLevel, ServiceOptions, configuration::DEFAULT_PORT};
use tracing_subscriber::EnvFilter;

const CLI_AFTER_HELP: &str = "Examples:\n  framegrab\n  PORT=9000 framegrab --max-video-mb 200\n  framegrab --host 127.0.0.1 --port 8080 --verbose\n\nRequest:\n  curl -X POST localhost:8000/extract-frame \\\n    -H 'content-type: application/json' \\\n    -d '{\"video_url\": \"https://example.com/sample.mp4\", \"time\": 5.5}' -o frame.png";

#[derive(Debug, Parser)]
#[command(
    name = "framegrab",
    version,
    about = "Serve single video frames as PNG over HTTP",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Address to bind to.
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Largest video to download, in MiB.
    #[arg(long, default_value_t = 500)]
    max_video_mb: u64,

    /// Download timeout in seconds.
    #[arg(long, default_value_t = 120)]
    fetch_timeout: u64,

    /// Whole-request timeout in seconds.
    #[arg(long, default_value_t = 300)]
    request_timeout: u64,

    /// Directory for downloaded videos (defaults to the system temp dir).
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// FFmpeg's own stderr verbosity.
    #[arg(long, value_enum, default_value_t = FfmpegLogLevel::Error)]
    ffmpeg_log_level: FfmpegLogLevel,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn service_options(&self) -> ServiceOptions {
        let options = ServiceOptions::new()
            .with_host(self.host)
            .with_port(self.port)
            .with_max_video_bytes(self.max_video_mb.saturating_mul(1024 * 1024))
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout))
            .with_request_timeout(Duration::from_secs(self.request_timeout));

        match &self.temp_dir {
            Some(dir) => options.with_temp_dir(dir),
            None => options,
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    framegrab::set_ffmpeg_log_level(cli.ffmpeg_log_level);

    let options = cli.service_options();
    if let Some(dir) = options.temp_dir().filter(|dir| !dir.is_dir()) {
        return Err(format!("temp dir {} does not exist", dir.display()).into());
    }

    tracing::info!(
        address = %options.socket_addr(),
        max_video_bytes = options.max_video_bytes(),
        fetch_timeout = ?options.fetch_timeout(),
        request_timeout = ?options.request_timeout(),
        "Starting framegrab"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(framegrab::serve(&options))?;
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_defaults() {
        let cli = Cli::try_parse_from(["framegrab"]).unwrap();
        let options = cli.service_options();
        let defaults = ServiceOptions::new();

        assert_eq!(options.max_video_bytes(), defaults.max_video_bytes());
        assert_eq!(options.fetch_timeout(), defaults.fetch_timeout());
        assert_eq!(options.request_timeout(), defaults.request_timeout());
        assert_eq!(cli.ffmpeg_log_level, FfmpegLogLevel::Error);
    }

    #[test]
    fn flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "framegrab",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--max-video-mb",
            "2",
            "--fetch-timeout",
            "5",
            "--temp-dir",
            "/tmp",
            "--ffmpeg-log-level",
            "quiet",
        ])
        .unwrap();
        let options = cli.service_options();

        assert_eq!(options.socket_addr().to_string(), "127.0.0.1:9000");
        assert_eq!(options.max_video_bytes(), 2 * 1024 * 1024);
        assert_eq!(options.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(options.temp_dir(), Some(std::path::Path::new("/tmp")));
        assert_eq!(cli.ffmpeg_log_level, FfmpegLogLevel::Quiet);
    }
}
