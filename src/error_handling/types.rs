//! Failure classification types.

use strum::{Display, EnumIter};

/// Classes of provider-call failures, used for stats and for the
/// key-rotation decision in the fetch executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ErrorType {
    /// Request exceeded the configured timeout.
    Timeout,
    /// TCP/TLS-level connection failure.
    Connect,
    /// Non-2xx HTTP status.
    HttpStatus,
    /// Provider rejected the credential (401/403/429 or quota text).
    KeyRejected,
    /// 200 response whose payload semantically means failure.
    LogicalError,
    /// Response body was not valid JSON.
    Parse,
    /// Anything else.
    Other,
}

/// Structured failure from one provider fetch attempt.
///
/// Carries the HTTP status (when there was one) so the credential pool can
/// classify the failure, plus a human message that ends up in
/// `meta.apiErrors` if the whole provider call fails.
#[derive(Clone, Debug)]
pub struct FetchFailure {
    /// HTTP status, when the failure happened at or after the response line.
    pub status: Option<u16>,
    /// Human-readable message (body excerpt or transport error).
    pub message: String,
    /// Classification for stats.
    pub error_type: ErrorType,
}

impl FetchFailure {
    /// Failure from a reqwest transport error.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        let error_type = if err.is_timeout() {
            ErrorType::Timeout
        } else if err.is_connect() {
            ErrorType::Connect
        } else {
            ErrorType::Other
        };
        Self {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            error_type,
        }
    }

    /// Whether a 5xx status makes this failure worth retrying on another key.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status, Some(code) if code >= 500)
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_status() {
        let with = FetchFailure {
            status: Some(503),
            message: "unavailable".into(),
            error_type: ErrorType::HttpStatus,
        };
        assert_eq!(with.to_string(), "HTTP 503: unavailable");

        let without = FetchFailure {
            status: None,
            message: "connection refused".into(),
            error_type: ErrorType::Connect,
        };
        assert_eq!(without.to_string(), "connection refused");
    }

    #[test]
    fn test_is_server_error() {
        let failure = FetchFailure {
            status: Some(502),
            message: String::new(),
            error_type: ErrorType::HttpStatus,
        };
        assert!(failure.is_server_error());
        let failure = FetchFailure {
            status: Some(429),
            message: String::new(),
            error_type: ErrorType::HttpStatus,
        };
        assert!(!failure.is_server_error());
    }
}
