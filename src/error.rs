//! Unified error types for tabtether

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for tabtether
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parse errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection to a browser endpoint failed after exhausting retries
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Target not found
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// Page not found
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// Unknown or stale semantic reference
    #[error("Unknown ref \"{0}\" - take a new snapshot and retry with a fresh ref")]
    UnknownRef(String),

    /// Timeout
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Action execution failed
    #[error("Action failed: {0}")]
    ActionFailed(String),

    /// Recording not found
    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    /// Invalid argument supplied by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        Error::Connection(msg.into())
    }

    /// Create a new target not found error
    pub fn target_not_found<S: Into<String>>(id: S) -> Self {
        Error::TargetNotFound(id.into())
    }

    /// Create a new page not found error
    pub fn page_not_found<S: Into<String>>(id: S) -> Self {
        Error::PageNotFound(id.into())
    }

    /// Create a new unknown ref error
    pub fn unknown_ref<S: Into<String>>(token: S) -> Self {
        Error::UnknownRef(token.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new action failed error
    pub fn action_failed<S: Into<String>>(msg: S) -> Self {
        Error::ActionFailed(msg.into())
    }

    /// Create a new recording not found error
    pub fn recording_not_found<S: Into<String>>(id: S) -> Self {
        Error::RecordingNotFound(id.into())
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }
}
