//! Risk adapter: portfolio risk metrics.

use std::sync::Arc;

use super::decode;
use super::error::AdapterError;
use super::fallback::{AdapterSubscription, subscribe_with_fallback};
use super::service::ServiceContext;
use crate::application::ports::StreamTransport;
use crate::domain::risk::RiskMetrics;
use crate::infrastructure::config::DashboardConfig;
use crate::infrastructure::stream::StreamClientConfig;

const ADAPTER: &str = "risk";

/// Risk metrics from the risk service.
#[derive(Debug, Clone)]
pub struct RiskAdapter {
    service: ServiceContext,
}

impl RiskAdapter {
    /// Event carrying one metrics snapshot.
    pub const METRICS_EVENT: &'static str = "risk_metrics";

    /// Build from dashboard configuration.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Client` if the HTTP client cannot be built.
    pub fn new(config: &DashboardConfig) -> Result<Self, AdapterError> {
        let stream = StreamClientConfig::from_stream_settings(&config.stream);
        let service = ServiceContext::new(ADAPTER, &config.services.risk, config, stream)?;
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

    /// Fetch the latest metrics once.
    ///
    /// # Errors
    ///
    /// Returns an `AdapterError` if the request or decoding fails.
    pub async fn get_metrics(&self) -> Result<Vec<RiskMetrics>, AdapterError> {
        self.service.rest().get_records("metrics", None).await
    }

    /// Receive every metrics snapshot, streamed or polled.
    pub fn subscribe_to_metrics<F>(&self, callback: F) -> AdapterSubscription
    where
        F: Fn(RiskMetrics) + Send + Sync + 'static,
    {
        let spec = self
            .service
            .fallback("metrics", None)
            .with_decoder(Self::METRICS_EVENT, decode::single(None));

        subscribe_with_fallback(spec, callback)
    }
}
