//! HTTP surface.
//!
//! Routes:
//!
//! - `POST /extract-frame`: JSON `{ "video_url": string, "time": number }`,
//!   answers `image/png`.
//! - `GET /`: service description.
//! - `GET /health`: liveness probe.
//!
//! Errors are answered with a JSON body `{ "error": kind, "message": ... }`.
//! Validation failures (422) also carry a `fields` array. Processing
//! failures use distinct statuses: 400 for undecodable content, 413/502/504
//! for download problems, 500 for internal faults. Oversized request bodies
//! (413) and requests that exceed the time limit (408) use the same shape.

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::{StatusCode, header},
    middleware::map_response,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    configuration::ServiceOptions,
    error::{ExtractorError, FetchError, FieldError, ValidationErrors},
    extractor::{FrameDecoder, FrameExtractor},
    fetch::VideoFetcher,
    frame::PNG_CONTENT_TYPE,
    request::ExtractionRequest,
};

/// Request bodies are tiny JSON objects.
const MAX_BODY_BYTES: usize = 64 * 1024;

const FRAME_DISPOSITION: &str = "attachment; filename=\"frame.png\"";

/// Build the application router around `extractor`.
///
/// Requests that run longer than `request_timeout` are answered with 408.
pub fn router<F, D>(extractor: Arc<FrameExtractor<F, D>>, request_timeout: Duration) -> Router
where
    F: VideoFetcher + 'static,
    D: FrameDecoder,
{
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/extract-frame", post(extract_frame::<F, D>))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(map_response(structure_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(extractor)
}

/// Bind to the configured address and serve until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns [`ExtractorError::Io`] if the address cannot be bound, or
/// [`ExtractorError::Fetch`] if the HTTP client cannot be built.
pub async fn serve(options: &ServiceOptions) -> Result<(), ExtractorError> {
    let extractor = Arc::new(FrameExtractor::from_options(options)?);
    let app = router(extractor, options.request_timeout());

    let listener = TcpListener::bind(options.socket_addr()).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                log::error!("Failed to listen for SIGTERM: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    log::info!("Shutdown signal received, draining connections");
}

async fn index() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /extract-frame": "Extract the frame at `time` seconds from the video at `video_url` as PNG",
            "GET /health": "Liveness probe",
        },
    }))
}

/// `TimeoutLayer` answers with an empty body; give it the JSON error shape.
async fn structure_timeout(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }

    log::warn!("Request exceeded the time limit");
    (
        StatusCode::REQUEST_TIMEOUT,
        Json(json!({
            "error": "timeout",
            "message": "request did not complete within the time limit",
        })),
    )
        .into_response()
}

fn body_error(rejection: BytesRejection) -> ExtractorError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ExtractorError::BodyTooLarge {
            limit: MAX_BODY_BYTES,
        };
    }
    ValidationErrors::from(FieldError::new("body", rejection.body_text())).into()
}

async fn extract_frame<F, D>(
    State(extractor): State<Arc<FrameExtractor<F, D>>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ExtractorError>
where
    F: VideoFetcher + 'static,
    D: FrameDecoder,
{
    let body = body.map_err(body_error)?;
    let request = ExtractionRequest::from_json(&body)?;
    let frame = extractor.extract(&request).await?;

    Ok((
        [
            (header::CONTENT_TYPE, PNG_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, FRAME_DISPOSITION),
        ],
        frame.into_bytes(),
    )
        .into_response())
}

impl ExtractorError {
    /// HTTP status used when this error ends a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExtractorError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ExtractorError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ExtractorError::Fetch(FetchError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ExtractorError::Fetch(FetchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ExtractorError::Fetch(FetchError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ExtractorError::Fetch(_) => StatusCode::BAD_GATEWAY,
            ExtractorError::Decode(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ExtractorError::Validation(_) => "validation_error",
            ExtractorError::BodyTooLarge { .. } => "payload_too_large",
            ExtractorError::Fetch(FetchError::Io(_)) => "internal_error",
            ExtractorError::Fetch(_) => "fetch_error",
            ExtractorError::Decode(_) => "decode_error",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for ExtractorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        // Internal messages can carry temp-file paths; keep them in the log.
        let body = match &self {
            ExtractorError::Validation(errors) => json!({
                "error": kind,
                "message": "request validation failed",
                "fields": errors.fields,
            }),
            _ if kind == "internal_error" => {
                log::error!("Request failed: {self}");
                json!({
                    "error": kind,
                    "message": "internal error while extracting frame",
                })
            }
            _ => {
                log::warn!("Request failed ({status}): {self}");
                json!({
                    "error": kind,
                    "message": self.to_string(),
                })
            }
        };

        (status, Json(body)).into_response()
    }
}
