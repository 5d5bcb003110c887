//! End-to-end tests: real download over loopback HTTP, real FFmpeg decode.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`,
//! except the ones exercising fetch failures.

use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::get,
};
use framegrab::{
    ExtractorError, FetchError, FfmpegDecoder, FrameExtractor, HttpFetcher, ServiceOptions, router,
};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tower::ServiceExt;

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

/// Serve `bytes` at `/sample.mp4` on an ephemeral loopback port.
async fn serve_video(bytes: Vec<u8>) -> SocketAddr {
    let app = Router::new().route(
        "/sample.mp4",
        get(move || {
            let bytes = bytes.clone();
            async move { bytes }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    address
}

fn extractor_in(directory: &TempDir, options: ServiceOptions) -> FrameExtractor {
    let options = options.with_temp_dir(directory.path());
    FrameExtractor::new(HttpFetcher::new(&options).unwrap(), FfmpegDecoder)
}

fn leftover_files(directory: &TempDir) -> usize {
    std::fs::read_dir(directory.path()).unwrap().count()
}

#[tokio::test]
async fn extracts_frame_with_source_dimensions() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let address = serve_video(std::fs::read(path).unwrap()).await;
    let directory = tempfile::tempdir().unwrap();
    let extractor = extractor_in(&directory, ServiceOptions::new());

    let frame = extractor
        .extract_frame(&format!("http://{address}/sample.mp4"), 5.5)
        .await
        .expect("Failed to extract frame");

    let image = image::load_from_memory(frame.bytes()).unwrap();
    assert_eq!((image.width(), image.height()), (320, 240));
    assert_eq!(leftover_files(&directory), 0);
}

#[tokio::test]
async fn time_beyond_duration_over_http() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let address = serve_video(std::fs::read(path).unwrap()).await;
    let directory = tempfile::tempdir().unwrap();
    let extractor = Arc::new(extractor_in(&directory, ServiceOptions::new()));
    let app = router(extractor, Duration::from_secs(60));

    let body = format!(r#"{{"video_url": "http://{address}/sample.mp4", "time": 9999}}"#);
    let response = app
        .oneshot(
            Request::post("/extract-frame")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_ne!(response.status(), StatusCode::OK);
    assert_eq!(leftover_files(&directory), 0);
}

#[tokio::test]
async fn upstream_not_found() {
    let address = serve_video(Vec::new()).await;
    let directory = tempfile::tempdir().unwrap();
    let extractor = extractor_in(&directory, ServiceOptions::new());

    let error = extractor
        .extract_frame(&format!("http://{address}/missing.mp4"), 1.0)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ExtractorError::Fetch(FetchError::Status { status: 404 })
    ));
    assert_eq!(leftover_files(&directory), 0);
}

#[tokio::test]
async fn oversized_video_is_refused() {
    let address = serve_video(vec![0u8; 64 * 1024]).await;
    let directory = tempfile::tempdir().unwrap();
    let extractor = extractor_in(&directory, ServiceOptions::new().with_max_video_bytes(1024));

    let error = extractor
        .extract_frame(&format!("http://{address}/sample.mp4"), 1.0)
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ExtractorError::Fetch(FetchError::TooLarge { limit: 1024 })
    ));
    assert_eq!(leftover_files(&directory), 0);
}

#[tokio::test]
async fn unreachable_host_is_a_fetch_error() {
    // Bind and immediately drop to get a port nobody listens on.
    let address = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let directory = tempfile::tempdir().unwrap();
    let extractor = extractor_in(&directory, ServiceOptions::new());

    let error = extractor
        .extract_frame(&format!("http://{address}/sample.mp4"), 1.0)
        .await
        .unwrap_err();

    assert!(matches!(error, ExtractorError::Fetch(FetchError::Transport(_))));
    assert_eq!(leftover_files(&directory), 0);
}

#[tokio::test]
async fn garbage_download_is_a_decode_error() {
    let address = serve_video(b"definitely not an mp4".to_vec()).await;
    let directory = tempfile::tempdir().unwrap();
    let extractor = extractor_in(&directory, ServiceOptions::new());

    let error = extractor
        .extract_frame(&format!("http://{address}/sample.mp4"), 0.0)
        .await
        .unwrap_err();

    assert!(matches!(error, ExtractorError::Decode(_)));
    assert_eq!(leftover_files(&directory), 0);
}
