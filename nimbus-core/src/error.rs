//! Error types for NIMBUS.
//!
//! This module provides the error hierarchy using `thiserror`. Authorization
//! failures carry a cloneable [`AuthorizationError`] so the same denial can be
//! stored once and surfaced verbatim to every later caller.

use thiserror::Error;

/// Result type alias using `NimbusError`.
pub type Result<T> = std::result::Result<T, NimbusError>;

/// An authorization denial reported by the cloud (or inferred by a classifier).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthorizationError {
    /// HTTP status that produced the denial, when known (401 or 403).
    pub status: Option<u16>,
    /// Human-readable reason.
    pub message: String,
}

impl AuthorizationError {
    /// Creates a denial without an HTTP status.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a denial for the given HTTP status.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// How a failed lookup must be treated by a memoizing cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// Terminal until the shared failure slot is cleared; never retried.
    AuthorizationDenied,
    /// Surfaced for this call only; a later call retries.
    Transient,
}

/// Main error type for all NIMBUS operations.
#[derive(Debug, Error)]
pub enum NimbusError {
    // ═══════════════════════════════════════════════════════════════════════════
    // AUTHORIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The calling identity is not (or no longer) authorized.
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(AuthorizationError),

    // ═══════════════════════════════════════════════════════════════════════════
    // NETWORK ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The server answered with a status the operation does not handle.
    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // NOVA ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The compute endpoint of a region does not expose the extension.
    #[error("Extension '{extension}' not available in region '{region}'")]
    ExtensionNotAvailable { region: String, extension: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // LOCATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Region or zone id is not configured.
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Malformed endpoint URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl NimbusError {
    /// Shorthand for an authorization denial without HTTP status.
    pub fn denied(message: impl Into<String>) -> Self {
        NimbusError::AuthorizationDenied(AuthorizationError::new(message))
    }

    /// Returns true if this error is an authorization denial.
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, NimbusError::AuthorizationDenied(_))
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, NimbusError::Timeout(_))
    }

    /// Returns true if this error is recoverable (can retry).
    pub fn is_recoverable(&self) -> bool {
        match self {
            NimbusError::HttpError(_) | NimbusError::Timeout(_) => true,
            NimbusError::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Default classification used by memoizing caches.
    ///
    /// Only explicit denials poison; every other failure is transient.
    pub fn failure_kind(&self) -> FailureKind {
        if self.is_authorization_failure() {
            FailureKind::AuthorizationDenied
        } else {
            FailureKind::Transient
        }
    }

    /// Returns the carried denial, if any.
    pub fn as_authorization_error(&self) -> Option<&AuthorizationError> {
        match self {
            NimbusError::AuthorizationDenied(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AuthorizationError> for NimbusError {
    fn from(err: AuthorizationError) -> Self {
        NimbusError::AuthorizationDenied(err)
    }
}
