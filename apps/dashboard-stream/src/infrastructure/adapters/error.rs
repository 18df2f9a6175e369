//! Adapter errors.

use crate::infrastructure::stream::StreamError;

/// A frame payload that cannot become a domain value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The body was JSON `null`.
    #[error("payload is null")]
    Null,

    /// The body was not JSON.
    #[error("payload is not JSON")]
    NotJson,

    /// The JSON value has the wrong shape.
    #[error("expected {expected}, found {found}")]
    UnexpectedShape {
        /// Shape the decoder needs.
        expected: &'static str,
        /// Shape received.
        found: &'static str,
    },

    /// The identifying field is absent, null or empty.
    #[error("missing identifying field {0:?}")]
    MissingKey(&'static str),

    /// A field has a value of the wrong type.
    #[error("invalid field value: {0}")]
    InvalidField(String),
}

/// Errors raised by adapters and their polling requests.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The request could not be sent or timed out.
    #[error("request to {url} failed: {reason}")]
    Request {
        /// Requested URL.
        url: String,
        /// Underlying failure.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("request to {url} returned status {status}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response body did not decode.
    #[error("response from {url} could not be decoded: {source}")]
    Body {
        /// Requested URL.
        url: String,
        /// Decode failure.
        source: DecodeError,
    },

    /// The HTTP client could not be built.
    #[error("HTTP client could not be built: {0}")]
    Client(String),

    /// The push stream could not be set up.
    #[error(transparent)]
    Stream(#[from] StreamError),
}
