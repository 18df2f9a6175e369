#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Dashboard Stream - Resilient Push Streams with Polling Fallback
//!
//! Keeps a trading dashboard fed with market data, positions, orders and
//! risk metrics. Each backend service exposes a Server-Sent Events stream;
//! when that stream cannot be kept alive the adapter switches to polling
//! the service's REST endpoint, and callers keep receiving the same values.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Value types with no I/O
//!   - `envelope`: Decoded stream frames
//!   - `connection`: Connection state and delivery mode
//!   - `subscription`: Per-client handler registry
//!   - `market_data`, `trading`, `risk`: Dashboard values
//!
//! - **Application**: Port definitions
//!   - `ports`: The stream transport interface
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `sse`: Event-stream decoder and HTTP transport
//!   - `stream`: Stream client with reconnection and timeout guard
//!   - `adapters`: Domain adapters with polling fallback
//!   - `rest`: Poll requests
//!   - `config`, `telemetry`, `metrics`, `health`: Ambient services
//!
//! # Data Flow
//!
//! ```text
//!                 ┌──────────────┐     ┌──────────────┐
//! SSE stream ────►│ StreamClient │────►│   Adapter    │──► callback
//!                 └──────┬───────┘     │  (decoding)  │
//!                        │ gave up     └──────▲───────┘
//!                        ▼                    │
//!                 ┌──────────────┐            │
//! REST endpoint ─►│    Poller    │────────────┘
//!                 └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Value types with no external I/O.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::{ConnectionMode, ConnectionState};
pub use domain::envelope::{DEFAULT_EVENT_TYPE, MessageEnvelope, Payload};
pub use domain::market_data::PriceUpdate;
pub use domain::risk::RiskMetrics;
pub use domain::subscription::{SubscriptionHandle, SubscriptionRegistry};
pub use domain::trading::{Order, OrderSide, OrderStatus, Position};

// Ports
pub use application::ports::{RawFrame, StreamTransport, TransportError};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, DashboardConfig, PollingSettings, ServerSettings, ServiceUrls, StreamSettings,
};

// Stream client
pub use infrastructure::stream::{StreamClient, StreamClientConfig, StreamError};

// Adapters
pub use infrastructure::adapters::{
    AdapterError, AdapterSubscription, DecodeError, MarketDataAdapter, RiskAdapter,
    TradingAdapter, subscribe_with_fallback,
};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
