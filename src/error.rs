// src/error.rs
//! Application error types with structured error handling.
//!
//! Each variant names what went wrong and where. The pipeline treats a few of
//! them specially: permission denials end a listing early, retryable API
//! failures are retried, and step failures carry the id of the failing step.

use std::fmt;
use thiserror::Error;

/// Upstream API error codes as a typed vocabulary.
///
/// The inventory API reports failures as `{"error": {"code", "message"}}`.
/// Matching on these variants keeps permission and throttling decisions out of
/// string comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// The caller is authenticated but lacks permission for the resource
    Forbidden,
    /// The token is invalid or expired
    Unauthorized,
    /// The resource does not exist
    NotFound,
    /// Request rate exceeded; back off and retry
    Throttled,
    /// The service is temporarily unavailable
    ServiceUnavailable,
    /// The service failed internally
    InternalError,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl ApiErrorCode {
    /// Parses an upstream error code string.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "Authorization_RequestDenied" | "AuthorizationFailed" | "Forbidden" | "accessDenied" => {
                Self::Forbidden
            }
            "InvalidAuthenticationToken" | "Unauthorized" | "ExpiredAuthenticationToken" => {
                Self::Unauthorized
            }
            "Request_ResourceNotFound" | "ResourceNotFound" | "itemNotFound" | "NotFound" => {
                Self::NotFound
            }
            "TooManyRequests" | "activityLimitReached" | "throttledRequest" => Self::Throttled,
            "ServiceUnavailable" | "serviceNotAvailable" => Self::ServiceUnavailable,
            "InternalServerError" | "generalException" => Self::InternalError,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Creates a code from an HTTP status when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::Throttled,
            503 => Self::ServiceUnavailable,
            500 => Self::InternalError,
            other => Self::HttpStatus(other),
        }
    }

    /// Whether this error means the caller lacks permission for the resource.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Forbidden | Self::HttpStatus(403))
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Throttled | Self::ServiceUnavailable | Self::InternalError => true,
            Self::HttpStatus(status) => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbidden => write!(f, "forbidden"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::NotFound => write!(f, "not_found"),
            Self::Throttled => write!(f, "throttled"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::InternalError => write!(f, "internal_error"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Configuration problems in a step table, detected before any step runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Dependency cycle between steps: {}", steps.join(" -> "))]
    Cycle { steps: Vec<String> },

    #[error("Step '{step}' depends on undeclared step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("Step id '{0}' is declared more than once")]
    DuplicateStep(String),

    #[error("Requested step '{0}' is not declared")]
    UnknownStep(String),
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Invalid resource locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("API returned an error ({code}, HTTP {status}) for {locator}: {message}")]
    Api {
        code: ApiErrorCode,
        status: u16,
        message: String,
        locator: String,
    },

    #[error("Request to {locator} timed out after {seconds}s")]
    Timeout { locator: String, seconds: u64 },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entity key '{key}' already exists with different content")]
    DuplicateEntity { key: String },

    #[error("Relationship key '{key}' already exists with different content")]
    DuplicateRelationship { key: String },

    #[error("Relationship references unknown entity key '{key}'")]
    DanglingReference { key: String },

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Step '{step_id}' failed: {cause}")]
    StepFailed { step_id: String, cause: String },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Validation(#[from] crate::types::ValidationError),
}

impl AppError {
    /// The upstream error code, when this error came from the API.
    pub fn api_code(&self) -> Option<&ApiErrorCode> {
        match self {
            AppError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Whether the request was rejected for lack of permission (HTTP 403).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            AppError::Api { code, status, .. } => *status == 403 || code.is_permission_denied(),
            _ => false,
        }
    }

    /// Whether the failure is transient and the request may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Api { code, .. } => code.is_retryable(),
            AppError::Timeout { .. } => true,
            AppError::NetworkFailure(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }
}

// Allow converting from anyhow::Error, preserving the message
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError {
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::InvalidLocator {
            locator: String::new(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: ApiErrorCode, status: u16) -> AppError {
        AppError::Api {
            code,
            status,
            message: "denied".to_string(),
            locator: "users".to_string(),
        }
    }

    #[test]
    fn forbidden_codes_are_permission_denials() {
        assert!(api_error(ApiErrorCode::Forbidden, 403).is_permission_denied());
        assert!(api_error(ApiErrorCode::from_http_status(403), 403).is_permission_denied());
        assert!(
            api_error(ApiErrorCode::from_api_response("Authorization_RequestDenied"), 403)
                .is_permission_denied()
        );
    }

    #[test]
    fn status_403_wins_over_unknown_code() {
        let err = api_error(ApiErrorCode::Unknown("SomethingNew".into()), 403);
        assert!(err.is_permission_denied());
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        assert!(api_error(ApiErrorCode::from_http_status(503), 503).is_retryable());
        assert!(api_error(ApiErrorCode::HttpStatus(502), 502).is_retryable());
        assert!(api_error(ApiErrorCode::Throttled, 429).is_retryable());
        assert!(!api_error(ApiErrorCode::NotFound, 404).is_retryable());
        assert!(!api_error(ApiErrorCode::HttpStatus(400), 400).is_retryable());
    }

    #[test]
    fn display_includes_locator_and_code() {
        let err = api_error(ApiErrorCode::NotFound, 404);
        assert_eq!(
            err.to_string(),
            "API returned an error (not_found, HTTP 404) for users: denied"
        );
    }

    #[test]
    fn plan_error_cycle_message() {
        let err = PlanError::Cycle {
            steps: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Dependency cycle between steps: a -> b -> a");
    }
}
