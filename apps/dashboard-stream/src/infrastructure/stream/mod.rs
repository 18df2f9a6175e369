//! Push-Stream Client
//!
//! The stream client and the pieces it orchestrates: the reconnection
//! policy and the per-attempt connection timeout guard. A scripted
//! transport for tests is available with the `test-util` feature.

pub mod client;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod reconnect;
pub mod timeout;

pub use client::{ErrorHook, LifecycleHook, StreamClient, StreamClientConfig, StreamError};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockFeed, MockTransport};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use timeout::ConnectionTimeoutGuard;
