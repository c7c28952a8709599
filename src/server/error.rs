//! API error envelope.
//!
//! Every non-2xx response is `{code, error}` JSON, plus `details` when the
//! service runs in development.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    /// Stable machine-readable code (`BAD_REQUEST`, ...).
    pub code: &'static str,
    /// Human-readable message.
    pub error: String,
    /// Extra context; populated only in development builds of the config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// 400 with code `BAD_REQUEST`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST",
            error: message.into(),
            details: None,
        }
    }

    /// 503 with code `SERVICE_UNAVAILABLE`.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "SERVICE_UNAVAILABLE",
            error: message.into(),
            details: None,
        }
    }

    /// 500 with code `INTERNAL_SERVER_ERROR`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_SERVER_ERROR",
            error: message.into(),
            details: None,
        }
    }

    /// Attaches detail text (shown only when the config says development).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization_shape() {
        let error = ApiError::bad_request("invalid IP");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["code"], "BAD_REQUEST");
        assert_eq!(json["error"], "invalid IP");
        assert!(json.get("status").is_none());
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_details_included_when_set() {
        let error = ApiError::internal("boom").with_details("stack");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["details"], "stack");
    }
}
