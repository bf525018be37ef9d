// Error types for the Waymark router

use crate::HttpStatus;
use thiserror::Error;

/// Errors surfaced by route registration, dispatch, handlers and middleware.
///
/// The router itself only raises [`Error::RouteCompilation`],
/// [`Error::RouteNotFound`] and [`Error::InvalidHandlerResult`]. Every
/// other variant originates in a handler or middleware and reaches the
/// dispatcher's caller unchanged.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid route path '{path}': {reason}")]
    RouteCompilation { path: String, reason: String },

    #[error("Route not found: {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("Handler for {method} {path} returned {kind} instead of a response")]
    InvalidHandlerResult {
        method: String,
        path: String,
        kind: &'static str,
    },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn compilation(path: &str, reason: impl Into<String>) -> Self {
        Error::RouteCompilation {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        match self {
            Error::RouteNotFound { .. } => HttpStatus::NotFound,
            Error::BadRequest(_) | Error::Deserialization(_) => HttpStatus::BadRequest,
            Error::Unauthorized(_) => HttpStatus::Unauthorized,
            Error::Forbidden(_) => HttpStatus::Forbidden,
            Error::PayloadTooLarge(_) => HttpStatus::PayloadTooLarge,
            _ => HttpStatus::InternalServerError,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }
}
