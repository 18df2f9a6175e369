//! Domain Adapters
//!
//! One adapter per backend service. Each subscribes through the push stream
//! and falls back to polling the service's REST endpoint when the stream
//! cannot be sustained.

pub mod decode;
pub mod error;
pub mod fallback;
pub mod market_data;
pub mod risk;
mod service;
pub mod trading;

pub use decode::Decoder;
pub use error::{AdapterError, DecodeError};
pub use fallback::{
    AdapterSubscription, DEFAULT_POLL_INTERVAL, FallbackSpec, PollFn, subscribe_with_fallback,
};
pub use market_data::MarketDataAdapter;
pub use risk::RiskAdapter;
pub use service::STREAM_PATH;
pub use trading::{TRADING_RECONNECT_DELAY, TradingAdapter};
