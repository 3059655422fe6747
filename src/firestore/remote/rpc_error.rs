use reqwest::StatusCode;
use serde::Deserialize;

use crate::firestore::error::{FirestoreError, FirestoreErrorCode};

#[derive(Debug, Default, Deserialize)]
struct GoogleErrorBody {
    #[serde(default)]
    error: Option<GoogleError>,
}

#[derive(Debug, Default, Deserialize)]
struct GoogleError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Turns a non-success REST response into a [`FirestoreError`].
///
/// The `status` of a Google error payload wins over the HTTP status; the
/// payload message wins over the reason phrase.
pub fn map_http_error(status: StatusCode, body: &str) -> FirestoreError {
    if status.is_success() {
        return FirestoreError::new(
            FirestoreErrorCode::Internal,
            format!("Received HTTP {} while handling error", status.as_u16()),
        );
    }

    let payload = serde_json::from_str::<GoogleErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .unwrap_or_default();

    let code = payload
        .status
        .as_deref()
        .and_then(FirestoreErrorCode::from_status)
        .unwrap_or_else(|| FirestoreErrorCode::from_http_status(status.as_u16()));

    let message = payload
        .message
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("HTTP error").to_string());

    FirestoreError::new(code, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_and_google_message() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        let err = map_http_error(StatusCode::FORBIDDEN, body);
        assert_eq!(err.code, FirestoreErrorCode::PermissionDenied);
        assert_eq!(err.message(), "Missing or insufficient permissions.");
    }

    #[test]
    fn payload_status_wins_over_http_status() {
        let body = r#"{"error":{"message":"not ready","status":"FAILED_PRECONDITION"}}"#;
        let err = map_http_error(StatusCode::CONFLICT, body);
        assert_eq!(err.code, FirestoreErrorCode::FailedPrecondition);
        assert_eq!(err.message(), "not ready");
    }

    #[test]
    fn unparseable_body_uses_reason_phrase() {
        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, "<html>");
        assert_eq!(err.code, FirestoreErrorCode::Unavailable);
        assert_eq!(err.message(), "Service Unavailable");
    }

    #[test]
    fn success_status_is_an_internal_fault() {
        let err = map_http_error(StatusCode::OK, "");
        assert_eq!(err.code, FirestoreErrorCode::Internal);
    }
}
