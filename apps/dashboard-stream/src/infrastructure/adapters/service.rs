//! Per-service plumbing shared by the domain adapters.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::de::DeserializeOwned;

use super::error::AdapterError;
use super::fallback::{FallbackSpec, PollFn};
use crate::application::ports::StreamTransport;
use crate::infrastructure::config::DashboardConfig;
use crate::infrastructure::rest::RestClient;
use crate::infrastructure::stream::StreamClientConfig;

/// Path of a service's push stream, relative to its base URL.
pub const STREAM_PATH: &str = "stream";

/// One backend service: its REST client, stream settings and poll cadence.
#[derive(Clone)]
pub(crate) struct ServiceContext {
    adapter: &'static str,
    rest: RestClient,
    stream: StreamClientConfig,
    poll_interval: Duration,
    transport: Option<Arc<dyn StreamTransport>>,
}

impl ServiceContext {
    pub(crate) fn new(
        adapter: &'static str,
        base_url: &str,
        config: &DashboardConfig,
        stream: StreamClientConfig,
    ) -> Result<Self, AdapterError> {
        let rest = RestClient::new(
            base_url,
            config.polling.request_timeout,
            config.stream.with_credentials,
        )?;

        Ok(Self {
            adapter,
            rest,
            stream,
            poll_interval: config.polling.interval,
            transport: None,
        })
    }

    pub(crate) fn set_transport(&mut self, transport: Arc<dyn StreamTransport>) {
        self.transport = Some(transport);
    }

    pub(crate) fn set_stream_config(&mut self, stream: StreamClientConfig) {
        self.stream = stream;
    }

    pub(crate) const fn stream_config(&self) -> &StreamClientConfig {
        &self.stream
    }

    pub(crate) const fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub(crate) fn stream_endpoint(&self) -> String {
        self.rest.url(STREAM_PATH)
    }

    pub(crate) fn poller<T>(&self, path: &'static str, key: Option<&'static str>) -> PollFn<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let rest = self.rest.clone();
        Arc::new(move || {
            let rest = rest.clone();
            async move { rest.get_records(path, key).await }.boxed()
        })
    }

    /// Fallback spec with no decoders yet.
    pub(crate) fn fallback<T>(&self, poll_path: &'static str, key: Option<&'static str>) -> FallbackSpec<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let spec = FallbackSpec::new(self.adapter, self.stream_endpoint(), self.poller(poll_path, key))
            .with_config(self.stream.clone())
            .with_poll_interval(self.poll_interval);

        match &self.transport {
            Some(transport) => spec.with_transport(Arc::clone(transport)),
            None => spec,
        }
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("adapter", &self.adapter)
            .field("base_url", &self.rest.base_url())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
