//! Common error types for the school services.
//!
//! Every failure the access-control core can produce lives here, together with
//! the caller-facing [`ErrorResponse`] and the HTTP status each one maps to.
//! Internal detail (which flag was missing, whether a subject exists) stays in
//! the `Display` output for logs; [`ErrorResponse`] only ever carries generic
//! messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Access denied: {0}")]
    Denied(#[from] AccessDenied),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Auth(err) => err.status_code(),
            AppError::Denied(reason) => reason.status_code(),
            AppError::Database(_) => 503,
            AppError::Validation(_) => 400,
            AppError::NotFound(_) => 404,
            AppError::Config(_) | AppError::Internal(_) => 500,
        }
    }
}

/// Credential and principal resolution failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token subject has no live user record")]
    UnknownSubject,

    #[error("User store unavailable")]
    StoreUnavailable,
}

impl AuthError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidCredentials => 400,
            AuthError::InvalidSignature | AuthError::Expired | AuthError::UnknownSubject => 401,
            AuthError::StoreUnavailable => 503,
        }
    }

    /// Whether retrying the whole request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::StoreUnavailable)
    }
}

/// Reason an access decision came out as deny.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDenied {
    #[error("no authenticated principal")]
    Unauthenticated,

    #[error("principal lacks every role the policy accepts")]
    Forbidden,
}

impl AccessDenied {
    /// HTTP status code for this deny reason.
    pub fn status_code(&self) -> u16 {
        match self {
            AccessDenied::Unauthenticated => 401,
            AccessDenied::Forbidden => 403,
        }
    }
}

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

const UNAUTHORIZED: (&str, &str) = ("AUTH_UNAUTHORIZED", "Could not validate credentials");

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        // Signature failures and missing subjects share one code so a caller
        // cannot probe which user ids exist.
        let (code, message) = match err {
            AuthError::InvalidCredentials => {
                ("AUTH_INVALID_CREDENTIALS", "Incorrect username or password")
            }
            AuthError::InvalidSignature | AuthError::UnknownSubject => UNAUTHORIZED,
            AuthError::Expired => ("AUTH_TOKEN_EXPIRED", "Token has expired"),
            AuthError::StoreUnavailable => {
                ("SERVICE_UNAVAILABLE", "Service temporarily unavailable")
            }
        };
        Self::new(code, message)
    }
}

impl From<&AccessDenied> for ErrorResponse {
    fn from(reason: &AccessDenied) -> Self {
        let (code, message) = match reason {
            AccessDenied::Unauthenticated => UNAUTHORIZED,
            AccessDenied::Forbidden => ("AUTH_FORBIDDEN", "Access forbidden"),
        };
        Self::new(code, message)
    }
}

impl From<&DatabaseError> for ErrorResponse {
    fn from(_: &DatabaseError) -> Self {
        Self::new("SERVICE_UNAVAILABLE", "Service temporarily unavailable")
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Auth(e) => e.into(),
            AppError::Denied(reason) => reason.into(),
            AppError::Database(e) => e.into(),
            AppError::Validation(msg) => Self::new("VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(what) => Self::new("NOT_FOUND", format!("{what} not found")),
            AppError::Config(_) | AppError::Internal(_) => {
                Self::new("INTERNAL_ERROR", "Internal server error")
            }
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::from(AuthError::InvalidSignature).status_code(), 401);
        assert_eq!(AppError::from(AuthError::Expired).status_code(), 401);
        assert_eq!(AppError::from(AuthError::UnknownSubject).status_code(), 401);
        assert_eq!(AppError::from(AuthError::StoreUnavailable).status_code(), 503);
        assert_eq!(AppError::from(AuthError::InvalidCredentials).status_code(), 400);
        assert_eq!(AppError::from(AccessDenied::Unauthenticated).status_code(), 401);
        assert_eq!(AppError::from(AccessDenied::Forbidden).status_code(), 403);
    }

    #[test]
    fn test_unknown_subject_is_indistinguishable_from_bad_signature() {
        let unknown = ErrorResponse::from(&AuthError::UnknownSubject);
        let bad_sig = ErrorResponse::from(&AuthError::InvalidSignature);
        let anonymous = ErrorResponse::from(&AccessDenied::Unauthenticated);
        assert_eq!(unknown.code, bad_sig.code);
        assert_eq!(unknown.message, bad_sig.message);
        assert_eq!(unknown.code, anonymous.code);
    }

    #[test]
    fn test_internal_detail_is_not_echoed() {
        let err = AppError::Config("SECRET_KEY is not set".to_string());
        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, "INTERNAL_ERROR");
        assert!(!response.message.contains("SECRET_KEY"));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], "INTERNAL_ERROR");
    }

    #[test]
    fn test_only_store_failures_are_transient() {
        assert!(AuthError::StoreUnavailable.is_transient());
        assert!(!AuthError::UnknownSubject.is_transient());
        assert!(!AuthError::Expired.is_transient());
    }
}
