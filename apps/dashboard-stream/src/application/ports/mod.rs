//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `StreamTransport`: opens a one-way push connection and yields raw frames

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

// =============================================================================
// Raw Frames
// =============================================================================

/// One frame as delivered by the transport, before body decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFrame {
    /// Event type label, if the frame carried one.
    pub event_type: Option<String>,
    /// Body text.
    pub data: String,
    /// Event identifier, if the frame carried one.
    pub id: Option<String>,
    /// Server-suggested reconnection delay, if the frame carried one.
    pub retry: Option<Duration>,
}

impl RawFrame {
    /// Create a frame with an event type and body.
    #[must_use]
    pub fn new(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    /// Attach an event identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Frames from an open transport. The stream ending, or yielding an error,
/// means the connection dropped.
pub type FrameStream = BoxStream<'static, Result<RawFrame, TransportError>>;

// =============================================================================
// Transport Port
// =============================================================================

/// Errors raised by a push-stream transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The server answered, but not with a push stream.
    #[error("stream rejected: {0}")]
    Rejected(String),

    /// The connection dropped while reading frames.
    #[error("stream interrupted: {0}")]
    Interrupted(String),
}

/// A transport capable of opening a one-way push connection to a URL.
///
/// `open` resolving to `Ok` is the "open" lifecycle event. Dropping the
/// returned stream (or the pending `open` future) closes the connection.
#[async_trait]
pub trait StreamTransport: Send + Sync + 'static {
    /// Open a push connection to `url`.
    async fn open(&self, url: &str) -> Result<FrameStream, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_frame_builder() {
        let frame = RawFrame::new("price", "{}").with_id("7");
        assert_eq!(frame.event_type.as_deref(), Some("price"));
        assert_eq!(frame.data, "{}");
        assert_eq!(frame.id.as_deref(), Some("7"));
        assert!(frame.retry.is_none());
    }

    #[test]
    fn transport_error_display() {
        let err = TransportError::Rejected("status 404".to_string());
        assert_eq!(err.to_string(), "stream rejected: status 404");
    }
}
