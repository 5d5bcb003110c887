//! Request parsing and validation.
//!
//! [`ExtractionRequest`] is the typed form of the `POST /extract-frame` body.
//! Every field is checked before any network or decoding work begins, and all
//! failing fields are reported together in a [`ValidationErrors`].
//!
//! # Example
//!
//! ```
//! use framegrab::ExtractionRequest;
//!
//! let request = ExtractionRequest::from_json(
//!     br#"{"video_url": "https://example.com/sample.mp4", "time": 5.5}"#,
//! )?;
//! assert_eq!(request.time.as_secs_f64(), 5.5);
//!
//! let error = ExtractionRequest::new("not-a-url", -1.0).unwrap_err();
//! assert!(error.contains("video_url"));
//! assert!(error.contains("time"));
//! # Ok::<(), framegrab::ValidationErrors>(())
//! ```

use std::time::Duration;

use serde_json::{Map, Value};
use url::Url;

use crate::error::{FieldError, ValidationErrors};

/// Schemes the fetcher is able to download from.
const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// A validated frame extraction request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    /// Absolute `http` or `https` URL of the video.
    pub video_url: Url,
    /// Presentation time of the requested frame.
    pub time: Duration,
}

impl ExtractionRequest {
    /// Validate a URL string and a time in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] listing every invalid field.
    pub fn new(video_url: &str, time: f64) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let video_url = parse_video_url(video_url)
            .map_err(|error| errors.fields.push(error))
            .ok();
        let time = parse_time(time)
            .map_err(|error| errors.fields.push(error))
            .ok();

        match (video_url, time) {
            (Some(video_url), Some(time)) => Ok(Self { video_url, time }),
            _ => Err(errors),
        }
    }

    /// Parse and validate a JSON request body.
    ///
    /// The body must be an object with a string `video_url` and a numeric
    /// `time`. Unknown fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] for malformed JSON, missing fields, wrong
    /// types, or out-of-range values.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationErrors> {
        let value: Value = serde_json::from_slice(body).map_err(|error| {
            ValidationErrors::from(FieldError::new(
                "body",
                format!("request body is not valid JSON: {error}"),
            ))
        })?;

        let Value::Object(object) = value else {
            return Err(FieldError::new("body", "request body must be a JSON object").into());
        };

        Self::from_object(&object)
    }

    fn from_object(object: &Map<String, Value>) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let video_url = match object.get("video_url") {
            None | Some(Value::Null) => {
                errors.push("video_url", "field required");
                None
            }
            Some(Value::String(raw)) => parse_video_url(raw)
                .map_err(|error| errors.fields.push(error))
                .ok(),
            Some(other) => {
                errors.push(
                    "video_url",
                    format!("expected a string, got {}", json_type_name(other)),
                );
                None
            }
        };

        let time = match object.get("time") {
            None | Some(Value::Null) => {
                errors.push("time", "field required");
                None
            }
            Some(Value::Number(number)) => match number.as_f64() {
                Some(seconds) => parse_time(seconds)
                    .map_err(|error| errors.fields.push(error))
                    .ok(),
                None => {
                    errors.push("time", "number is out of range");
                    None
                }
            },
            Some(other) => {
                errors.push(
                    "time",
                    format!("expected a number, got {}", json_type_name(other)),
                );
                None
            }
        };

        match (video_url, time) {
            (Some(video_url), Some(time)) if errors.is_empty() => Ok(Self { video_url, time }),
            _ => Err(errors),
        }
    }
}

fn parse_video_url(raw: &str) -> Result<Url, FieldError> {
    let url = Url::parse(raw.trim())
        .map_err(|error| FieldError::new("video_url", format!("invalid URL: {error}")))?;

    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(FieldError::new(
            "video_url",
            format!("unsupported scheme '{}', expected http or https", url.scheme()),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(FieldError::new("video_url", "URL must include a host"));
    }

    Ok(url)
}

fn parse_time(seconds: f64) -> Result<Duration, FieldError> {
    if !seconds.is_finite() {
        return Err(FieldError::new("time", "must be a finite number of seconds"));
    }
    if seconds < 0.0 {
        return Err(FieldError::new(
            "time",
            format!("must be non-negative, got {seconds}"),
        ));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| FieldError::new("time", format!("{seconds} seconds is too large")))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_body() {
        let request = ExtractionRequest::from_json(
            br#"{"video_url": "https://example.com/sample.mp4", "time": 5.5}"#,
        )
        .unwrap();
        assert_eq!(request.video_url.as_str(), "https://example.com/sample.mp4");
        assert_eq!(request.time, Duration::from_millis(5500));
    }

    #[test]
    fn accepts_integer_time() {
        let request =
            ExtractionRequest::from_json(br#"{"video_url": "http://example.com/a.webm", "time": 3}"#)
                .unwrap();
        assert_eq!(request.time, Duration::from_secs(3));
    }

    #[test]
    fn zero_time_is_valid() {
        assert!(ExtractionRequest::new("https://example.com/v.mp4", 0.0).is_ok());
    }

    #[test]
    fn rejects_negative_time() {
        let error = ExtractionRequest::new("https://example.com/sample.mp4", -1.0).unwrap_err();
        assert_eq!(error.fields.len(), 1);
        assert_eq!(error.fields[0].field, "time");
        assert!(error.fields[0].message.contains("non-negative"));
    }

    #[test]
    fn rejects_non_finite_time() {
        assert!(ExtractionRequest::new("https://example.com/v.mp4", f64::NAN).is_err());
        assert!(ExtractionRequest::new("https://example.com/v.mp4", f64::INFINITY).is_err());
    }

    #[test]
    fn rejects_huge_time() {
        let error = ExtractionRequest::new("https://example.com/v.mp4", 1e300).unwrap_err();
        assert!(error.fields[0].message.contains("too large"));
    }

    #[test]
    fn rejects_relative_url() {
        let error = ExtractionRequest::new("not-a-url", 1.0).unwrap_err();
        assert!(error.contains("video_url"));
        assert!(!error.contains("time"));
    }

    #[test]
    fn rejects_unsupported_scheme() {
        let error = ExtractionRequest::new("file:///etc/passwd", 1.0).unwrap_err();
        assert!(error.fields[0].message.contains("unsupported scheme"));

        let error = ExtractionRequest::new("ftp://example.com/v.mp4", 1.0).unwrap_err();
        assert!(error.contains("video_url"));
    }

    #[test]
    fn reports_every_failing_field() {
        let error =
            ExtractionRequest::from_json(br#"{"video_url": "not-a-url", "time": -2}"#).unwrap_err();
        assert!(error.contains("video_url"));
        assert!(error.contains("time"));
    }

    #[test]
    fn reports_missing_fields() {
        let error = ExtractionRequest::from_json(b"{}").unwrap_err();
        assert_eq!(error.fields.len(), 2);
        assert!(error.fields.iter().all(|f| f.message == "field required"));
    }

    #[test]
    fn reports_wrong_types() {
        let error =
            ExtractionRequest::from_json(br#"{"video_url": 42, "time": "5.5"}"#).unwrap_err();
        assert_eq!(error.fields[0].message, "expected a string, got number");
        assert_eq!(error.fields[1].message, "expected a number, got string");
    }

    #[test]
    fn rejects_non_object_and_malformed_bodies() {
        let error = ExtractionRequest::from_json(b"[1, 2]").unwrap_err();
        assert!(error.contains("body"));

        let error = ExtractionRequest::from_json(b"{\"video_url\": ").unwrap_err();
        assert!(error.contains("body"));
        assert!(error.fields[0].message.starts_with("request body is not valid JSON"));
    }
}
