//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Domain adapters with polling fallback.
pub mod adapters;

/// Configuration loaded from the environment.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Request-based fetches for the fallback pollers.
pub mod rest;

/// Server-Sent Events decoding and transport.
pub mod sse;

/// Resilient stream client: reconnection, timeout guard, lifecycle hooks.
pub mod stream;

/// OpenTelemetry tracing integration.
pub mod telemetry;
