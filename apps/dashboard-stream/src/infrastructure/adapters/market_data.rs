//! Market data adapter: live price updates.

use std::sync::Arc;

use super::decode;
use super::error::AdapterError;
use super::fallback::{AdapterSubscription, subscribe_with_fallback};
use super::service::ServiceContext;
use crate::application::ports::StreamTransport;
use crate::domain::market_data::PriceUpdate;
use crate::infrastructure::config::DashboardConfig;
use crate::infrastructure::stream::StreamClientConfig;

const ADAPTER: &str = "market_data";
const KEY: Option<&str> = Some("asset");

/// Price updates from the market data service.
#[derive(Debug, Clone)]
pub struct MarketDataAdapter {
    service: ServiceContext,
}

impl MarketDataAdapter {
    /// Event carrying one price update.
    pub const PRICE_EVENT: &'static str = "price";
    /// Event carrying an array of price updates.
    pub const PRICES_EVENT: &'static str = "prices";

    /// Build from dashboard configuration.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Client` if the HTTP client cannot be built.
    pub fn new(config: &DashboardConfig) -> Result<Self, AdapterError> {
        let stream = StreamClientConfig::from_stream_settings(&config.stream);
        let service = ServiceContext::new(ADAPTER, &config.services.market_data, config, stream)?;
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

    /// Fetch current prices once.
    ///
    /// # Errors
    ///
    /// Returns an `AdapterError` if the request or decoding fails.
    pub async fn get_prices(&self) -> Result<Vec<PriceUpdate>, AdapterError> {
        self.service.rest().get_records("prices", KEY).await
    }

    /// Receive every price update, streamed or polled.
    pub fn subscribe_to_prices<F>(&self, callback: F) -> AdapterSubscription
    where
        F: Fn(PriceUpdate) + Send + Sync + 'static,
    {
        let spec = self
            .service
            .fallback("prices", KEY)
            .with_decoder(Self::PRICE_EVENT, decode::single(KEY))
            .with_decoder(Self::PRICES_EVENT, decode::batch(KEY));

        subscribe_with_fallback(spec, callback)
    }
}
