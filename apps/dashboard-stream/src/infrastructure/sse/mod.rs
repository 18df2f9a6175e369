//! Server-Sent Events
//!
//! Wire codec and HTTP transport for `text/event-stream` push connections.

pub mod codec;
pub mod transport;

pub use codec::SseDecoder;
pub use transport::{CredentialsMode, SseTransport};
