//! Connection State Types
//!
//! `ConnectionState` is the lifecycle of one stream client;
//! `ConnectionMode` is how an adapter subscription is currently being fed.

use serde::Serialize;

/// Lifecycle of a stream client.
///
/// ```text
/// Idle ──connect()──► Connecting ──open──► Open
///                         ▲                 │
///                         └──── backoff ◄───┴── error ──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Constructed, `connect()` not called yet.
    #[default]
    Idle,
    /// A connection attempt is in flight or a reconnect is scheduled.
    Connecting,
    /// Transport is open and delivering frames.
    Open,
    /// Disconnected explicitly or after giving up.
    Closed,
}

impl ConnectionState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// How an adapter subscription is currently delivering values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Values arrive over the push stream.
    Streaming,
    /// Push stream abandoned; values come from the fixed-interval poller.
    Polling,
    /// Neither path is currently delivering (connecting, reconnecting, or cancelled).
    #[default]
    Disconnected,
}

impl ConnectionMode {
    /// Get the mode name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Polling => "polling",
            Self::Disconnected => "disconnected",
        }
    }
}
