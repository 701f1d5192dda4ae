//! Error model: request-time HTTP errors and setup-time configuration errors.

use http::StatusCode;
use thiserror::Error;

/// Result type used by validation and application handlers.
pub type WebResult<T> = Result<T, WebError>;

/// An error carrying the HTTP status the client should receive.
///
/// The message is sent to the client verbatim, so keep internal detail out of
/// it. Errors without an explicit status should stay as plain errors and let
/// the reporter answer with a generic 500.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct WebError {
    status: StatusCode,
    message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Client supplied data that failed a declared rule.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// A programming mistake detected while serving a request.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ConfigError> for WebError {
    fn from(err: ConfigError) -> Self {
        Self::internal(err.to_string())
    }
}

/// Construct a [`WebError`] from a raw status code.
///
/// Codes outside `100..=999` are not valid HTTP statuses and become a 500, so a
/// typo in a handler never turns into a malformed response.
pub fn error(status: u16, message: impl Into<String>) -> WebError {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    WebError::new(status, message)
}

/// Misuse of the registration or validation API.
///
/// These indicate a bug in the calling code, not a bad request, and are never
/// retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("route verb must be one of get, post, put, patch, delete (got {0:?})")]
    InvalidVerb(String),

    #[error("route path must be a non-empty string starting with '/' (got {0:?})")]
    InvalidPath(String),

    #[error("{verb} {path} must be registered with at least one step")]
    NoSteps { verb: String, path: String },

    #[error("{verb} {path} is already registered")]
    DuplicateRoute { verb: String, path: String },

    #[error("{path} conflicts with {existing}: same shape, different parameter names")]
    ConflictingPath { path: String, existing: String },

    #[error("rule set field names must not be empty")]
    EmptyFieldName,

    #[error("rule set lists field {0:?} more than once")]
    DuplicateField(String),

    #[error("{field}: requires must list non-empty field names other than the field itself")]
    InvalidRequires { field: String },
}
