//! Trading adapter: positions and orders.

use std::sync::Arc;
use std::time::Duration;

use super::decode;
use super::error::AdapterError;
use super::fallback::{AdapterSubscription, subscribe_with_fallback};
use super::service::ServiceContext;
use crate::application::ports::StreamTransport;
use crate::domain::trading::{Order, Position};
use crate::infrastructure::config::DashboardConfig;
use crate::infrastructure::stream::StreamClientConfig;

const ADAPTER: &str = "trading";
const POSITION_KEY: Option<&str> = Some("symbol");
const ORDER_KEY: Option<&str> = Some("order_id");

/// Base reconnect delay of the trading stream.
pub const TRADING_RECONNECT_DELAY: Duration = Duration::from_millis(1000);

/// Positions and orders from the trading service.
#[derive(Debug, Clone)]
pub struct TradingAdapter {
    service: ServiceContext,
}

impl TradingAdapter {
    /// Event carrying one position.
    pub const POSITION_EVENT: &'static str = "position";
    /// Event carrying every open position.
    pub const POSITIONS_EVENT: &'static str = "positions";
    /// Event carrying one order.
    pub const ORDER_EVENT: &'static str = "order";
    /// Event carrying a batch of orders.
    pub const ORDERS_EVENT: &'static str = "orders";

    /// Build from dashboard configuration. The trading stream reconnects
    /// on a shorter base delay than the other services.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Client` if the HTTP client cannot be built.
    pub fn new(config: &DashboardConfig) -> Result<Self, AdapterError> {
        let stream = StreamClientConfig::from_stream_settings(&config.stream)
            .with_reconnect_delay(TRADING_RECONNECT_DELAY);
        let service = ServiceContext::new(ADAPTER, &config.services.trading, config, stream)?;
        Ok(Self { service })
    }

    /// Stream over `transport` instead of Server-Sent Events.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn StreamTransport>) -> Self {
        self.service.set_transport(transport);
        self
    }

    /// Override the stream client settings.
    #[must_use]
    pub fn with_stream_config(mut self, stream: StreamClientConfig) -> Self {
        self.service.set_stream_config(stream);
        self
    }

    /// Stream endpoint.
    #[must_use]
    pub fn stream_endpoint(&self) -> String {
        self.service.stream_endpoint()
    }

    /// Fetch open positions once.
    ///
    /// # Errors
    ///
    /// Returns an `AdapterError` if the request or decoding fails.
    pub async fn get_positions(&self) -> Result<Vec<Position>, AdapterError> {
        self.service.rest().get_records("positions", POSITION_KEY).await
    }

    /// Fetch orders once.
    ///
    /// # Errors
    ///
    /// Returns an `AdapterError` if the request or decoding fails.
    pub async fn get_orders(&self) -> Result<Vec<Order>, AdapterError> {
        self.service.rest().get_records("orders", ORDER_KEY).await
    }

    /// Receive every position update, streamed or polled.
    pub fn subscribe_to_positions<F>(&self, callback: F) -> AdapterSubscription
    where
        F: Fn(Position) + Send + Sync + 'static,
    {
        let spec = self
            .service
            .fallback("positions", POSITION_KEY)
            .with_decoder(Self::POSITION_EVENT, decode::single(POSITION_KEY))
            .with_decoder(Self::POSITIONS_EVENT, decode::batch(POSITION_KEY));

        subscribe_with_fallback(spec, callback)
    }

    /// Receive every order update, streamed or polled.
    pub fn subscribe_to_orders<F>(&self, callback: F) -> AdapterSubscription
    where
        F: Fn(Order) + Send + Sync + 'static,
    {
        let spec = self
            .service
            .fallback("orders", ORDER_KEY)
            .with_decoder(Self::ORDER_EVENT, decode::single(ORDER_KEY))
            .with_decoder(Self::ORDERS_EVENT, decode::batch(ORDER_KEY));

        subscribe_with_fallback(spec, callback)
    }
}
