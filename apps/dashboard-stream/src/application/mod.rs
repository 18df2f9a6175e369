//! Application Layer - Port definitions.
//!
//! This layer contains the interfaces the streaming core consumes from
//! the outside world, so that the stream client can be driven by a real
//! network transport or by a scripted one in tests.

/// Port interfaces for external systems (push-stream transport).
pub mod ports;
