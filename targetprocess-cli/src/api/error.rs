//! Error taxonomy for the Targetprocess API layer
//!
//! Validation problems are detected before any request is sent, transport
//! failures come out of the retry loop with the attempt count attached, and
//! pagination misses are plain lookup failures.

use thiserror::Error;

/// Caller-side problem with a query (bad filter, bad include, unknown type)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn empty_where() -> Self {
        Self::new("empty where clause")
    }

    pub fn invalid_condition(condition: &str) -> Self {
        Self::new(format!("invalid condition: {}", condition))
    }
}

/// HTTP-level failure after the retry policy gave up
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// 400/401 and any status outside the retryable set. Never retried.
    #[error("request failed after {attempts} attempt(s){}: {message}", fmt_status(.status))]
    Terminal {
        status: Option<u16>,
        message: String,
        attempts: u32,
    },
    /// 429/5xx/network/timeout failure that persisted through every retry
    #[error("request failed after {attempts} attempt(s){}: {message}", fmt_status(.status))]
    Retryable {
        status: Option<u16>,
        message: String,
        attempts: u32,
    },
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Terminal { status, .. } | TransportError::Retryable { status, .. } => {
                *status
            }
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            TransportError::Terminal { attempts, .. }
            | TransportError::Retryable { attempts, .. } => *attempts,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TransportError::Terminal { message, .. } | TransportError::Retryable { message, .. } => {
                message
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransportError::Terminal { .. })
    }
}

/// Pagination lookup against an unknown, expired or exhausted key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NotFoundError {
    pub message: String,
}

impl NotFoundError {
    pub fn expired_key(key: &str) -> Self {
        Self {
            message: format!(
                "No cached result for key '{}'. It may have expired; re-run the original search to get a fresh result.",
                key
            ),
        }
    }

    pub fn page_out_of_range(key: &str, page: usize, total_pages: usize) -> Self {
        Self {
            message: format!(
                "Page {} does not exist for key '{}' ({} page(s) available)",
                page, key, total_pages
            ),
        }
    }
}

/// Everything a call to the API layer can fail with
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_reports_attempts_and_status() {
        let err = TransportError::Retryable {
            status: Some(503),
            message: "Service Unavailable".to_string(),
            attempts: 4,
        };
        assert_eq!(
            err.to_string(),
            "request failed after 4 attempt(s) (HTTP 503): Service Unavailable"
        );
        assert_eq!(err.attempts(), 4);
        assert!(!err.is_terminal());
    }

    #[test]
    fn test_transport_error_without_status() {
        let err = TransportError::Terminal {
            status: None,
            message: "builder error".to_string(),
            attempts: 1,
        };
        assert_eq!(err.to_string(), "request failed after 1 attempt(s): builder error");
    }

    #[test]
    fn test_api_error_from_conversions() {
        let err: ApiError = ValidationError::invalid_condition("Name ~ 'x'").into();
        assert_eq!(err.to_string(), "validation error: invalid condition: Name ~ 'x'");

        let err: ApiError = NotFoundError::expired_key("abc").into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
