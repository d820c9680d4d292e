//! Unified application error types for DriveHub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The referenced node, user, or grant does not exist.
    NotFound,
    /// The caller does not have permission to perform the action.
    ///
    /// Deliberately carries no detail about which grant was missing.
    Authorization,
    /// Input validation failed.
    Validation,
    /// A move would place a node inside its own subtree.
    InvalidMove,
    /// A conflict occurred (duplicate entry, concurrent modification).
    Conflict,
    /// A transient remote failure (network, timeout, throttling, 5xx).
    /// Safe to retry the whole operation.
    RemoteTransient,
    /// A permanent remote failure (quota exceeded, remote not-found,
    /// conflict). Not retried automatically.
    RemotePermanent,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Authorization => write!(f, "AUTHORIZATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::InvalidMove => write!(f, "INVALID_MOVE"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::RemoteTransient => write!(f, "REMOTE_TRANSIENT"),
            Self::RemotePermanent => write!(f, "REMOTE_PERMANENT"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout DriveHub.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. Every public operation surfaces one of
/// the [`ErrorKind`] categories, never a raw internal error.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an authorization (permission-denied) error.
    pub fn permission_denied() -> Self {
        Self::new(ErrorKind::Authorization, "Permission denied")
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an invalid-move error.
    pub fn invalid_move(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidMove, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a transient remote error.
    pub fn remote_transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteTransient, message)
    }

    /// Create a permanent remote error.
    pub fn remote_permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemotePermanent, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the operation that produced this error is safe to retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::RemoteTransient)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = AppError::not_found("Node abc not found");
        assert_eq!(err.to_string(), "NOT_FOUND: Node abc not found");
    }

    #[test]
    fn test_permission_denied_carries_no_detail() {
        let err = AppError::permission_denied();
        assert_eq!(err.to_string(), "AUTHORIZATION: Permission denied");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::remote_transient("timeout").is_retryable());
        assert!(!AppError::remote_permanent("quota exceeded").is_retryable());
        assert!(!AppError::not_found("gone").is_retryable());
    }
}
