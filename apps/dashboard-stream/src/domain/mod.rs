//! Domain Layer - Core streaming types with no I/O.
//!
//! This layer contains the data model of the streaming resilience layer:
//! decoded frames, per-client handler registries, the connection state
//! observed by adapters, and the dashboard values adapters deliver.
//! Nothing here touches the network.

/// Decoded inbound frames (`MessageEnvelope`, `Payload`).
pub mod envelope;

/// Connection lifecycle and adapter delivery modes.
pub mod connection;

/// Event-type keyed handler registry.
pub mod subscription;

/// Price updates.
pub mod market_data;

/// Positions and orders.
pub mod trading;

/// Portfolio risk metrics.
pub mod risk;

mod timestamp;
