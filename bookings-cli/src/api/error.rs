//! Error types for the Bookings OData client

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the OData client layer
#[derive(Debug, Error)]
pub enum ODataError {
    /// The service root handed to the container does not end in '/'
    #[error("Service root must end with '/': {0}")]
    InvalidServiceRoot(String),

    /// The request message does not implement this operation
    #[error("Operation not supported by this request message: {operation}")]
    Unsupported { operation: &'static str },

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Non-success HTTP status, with the OData error payload when the service sent one
    #[error("Bookings service returned {status}: {message}")]
    Service {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A continuation link pointed back at the page just fetched
    #[error("Server returned a nextLink identical to the current page: {0}")]
    PagingLoop(String),

    #[error("Entity has not been saved yet and has no key")]
    MissingKey,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl ODataError {
    pub(crate) fn unsupported(operation: &'static str) -> Self {
        Self::Unsupported { operation }
    }

    /// Check if this error is the "not supported" signal from a request message
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// HTTP status code, if the error came from the service
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Http(err) => err.status(),
            _ => None,
        }
    }
}

/// Result alias for the OData client layer
pub type Result<T> = std::result::Result<T, ODataError>;
