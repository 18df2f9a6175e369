//! Stream-or-poll subscription shared by every domain adapter.
//!
//! [`subscribe_with_fallback`] opens a [`StreamClient`] with one handler per
//! event type. If the client cannot be built, or later reports that its
//! reconnection policy gave up, a fixed-interval poller takes over and feeds
//! the same callback. The returned [`AdapterSubscription`] tears down
//! whichever paths were started.
//!
//! The current [`ConnectionMode`] is published on a `watch` channel. Every
//! mode change happens under the fallback's phase lock, so a cancelled
//! subscription always ends `Disconnected`.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::decode::Decoder;
use super::error::AdapterError;
use crate::application::ports::StreamTransport;
use crate::domain::connection::ConnectionMode;
use crate::domain::subscription::{SubscriptionHandle, panic_message};
use crate::infrastructure::metrics::{self, PollOutcome};
use crate::infrastructure::stream::{StreamClient, StreamClientConfig, StreamError};

/// Default interval between fallback polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Request-based fetch used while polling.
pub type PollFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<T>, AdapterError>> + Send + Sync>;

/// Everything one adapter subscription needs: where to stream from, how to
/// decode each event type and how to poll.
pub struct FallbackSpec<T> {
    adapter: &'static str,
    endpoint: String,
    config: StreamClientConfig,
    decoders: Vec<(String, Decoder<T>)>,
    poll: PollFn<T>,
    poll_interval: Duration,
    transport: Option<Arc<dyn StreamTransport>>,
}

impl<T> FallbackSpec<T> {
    /// Create a spec with default stream settings and no event types.
    pub fn new(adapter: &'static str, endpoint: impl Into<String>, poll: PollFn<T>) -> Self {
        Self {
            adapter,
            endpoint: endpoint.into(),
            config: StreamClientConfig::default(),
            decoders: Vec::new(),
            poll,
            poll_interval: DEFAULT_POLL_INTERVAL,
            transport: None,
        }
    }

    /// Stream client settings.
    #[must_use]
    pub fn with_config(mut self, config: StreamClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Handle `event_type` frames with `decoder`.
    #[must_use]
    pub fn with_decoder(mut self, event_type: impl Into<String>, decoder: Decoder<T>) -> Self {
        self.decoders.push((event_type.into(), decoder));
        self
    }

    /// Interval between polls once fallen back.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Stream over `transport` instead of Server-Sent Events.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn StreamTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Adapter label used in logs and metrics.
    #[must_use]
    pub const fn adapter(&self) -> &'static str {
        self.adapter
    }

    /// Stream endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Event types with a decoder, in registration order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&str> {
        self.decoders.iter().map(|(event_type, _)| event_type.as_str()).collect()
    }
}

impl<T> std::fmt::Debug for FallbackSpec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackSpec")
            .field("adapter", &self.adapter)
            .field("endpoint", &self.endpoint)
            .field("event_types", &self.event_types())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Phase Control
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    Polling,
    Cancelled,
}

struct FallbackControl {
    phase: Mutex<Phase>,
    cancel: CancellationToken,
    mode: watch::Sender<ConnectionMode>,
}

impl FallbackControl {
    fn new() -> (Self, watch::Receiver<ConnectionMode>) {
        let (mode, receiver) = watch::channel(ConnectionMode::Disconnected);
        let control = Self {
            phase: Mutex::new(Phase::Streaming),
            cancel: CancellationToken::new(),
            mode,
        };
        (control, receiver)
    }

    fn stream_opened(&self) {
        let phase = self.phase.lock();
        if *phase == Phase::Streaming {
            self.mode.send_replace(ConnectionMode::Streaming);
        }
    }

    fn stream_lost(&self) {
        let phase = self.phase.lock();
        if *phase == Phase::Streaming {
            self.mode.send_replace(ConnectionMode::Disconnected);
        }
    }

    /// Switch to polling and run `spawn` with the poller's token. Returns
    /// `false` if already polling or cancelled.
    fn begin_polling(&self, spawn: impl FnOnce(CancellationToken)) -> bool {
        let mut phase = self.phase.lock();
        if *phase != Phase::Streaming {
            return false;
        }
        *phase = Phase::Polling;
        self.mode.send_replace(ConnectionMode::Polling);
        spawn(self.cancel.clone());
        true
    }

    /// Returns `false` if already cancelled.
    fn cancel(&self) -> bool {
        let mut phase = self.phase.lock();
        if *phase == Phase::Cancelled {
            return false;
        }
        *phase = Phase::Cancelled;
        self.cancel.cancel();
        self.mode.send_replace(ConnectionMode::Disconnected);
        true
    }

    fn is_cancelled(&self) -> bool {
        *self.phase.lock() == Phase::Cancelled
    }
}

// =============================================================================
// Fallback Poller
// =============================================================================

struct Fallback<T, F> {
    adapter: &'static str,
    poll: PollFn<T>,
    interval: Duration,
    callback: Arc<F>,
    control: Arc<FallbackControl>,
}

impl<T, F> Fallback<T, F>
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    fn activate(&self, reason: &str) {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(
                    adapter = self.adapter,
                    error = %e,
                    "Polling fallback could not start"
                );
                return;
            }
        };

        let started = self.control.begin_polling(|cancel| {
            runtime.spawn(run_poller(
                self.adapter,
                Arc::clone(&self.poll),
                self.interval,
                Arc::clone(&self.callback),
                cancel,
            ));
        });

        if started {
            metrics::record_fallback_activation(self.adapter);
            tracing::warn!(
                adapter = self.adapter,
                reason,
                interval_ms = self.interval.as_millis(),
                "Stream unavailable, falling back to polling"
            );
        }
    }
}

async fn run_poller<T, F>(
    adapter: &'static str,
    poll: PollFn<T>,
    interval: Duration,
    callback: Arc<F>,
    cancel: CancellationToken,
) where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = poll() => result,
        };

        match result {
            Ok(values) => {
                metrics::record_poll(adapter, PollOutcome::Success);
                tracing::debug!(adapter, count = values.len(), "Poll succeeded");
                for value in values {
                    if cancel.is_cancelled() {
                        break;
                    }
                    deliver(adapter, callback.as_ref(), value);
                }
            }
            Err(e) => {
                metrics::record_poll(adapter, PollOutcome::Failure);
                tracing::warn!(adapter, error = %e, "Poll failed");
            }
        }
    }

    tracing::debug!(adapter, "Poller stopped");
}

fn deliver<T, F: Fn(T)>(adapter: &'static str, callback: &F, value: T) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(value))) {
        metrics::record_handler_panics(1);
        tracing::error!(
            adapter,
            panic = panic_message(panic.as_ref()),
            "Adapter callback panicked"
        );
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// A live adapter subscription. Dropping it cancels it.
pub struct AdapterSubscription {
    adapter: &'static str,
    client: Mutex<Option<StreamClient>>,
    handles: Mutex<Vec<SubscriptionHandle>>,
    control: Arc<FallbackControl>,
    mode: watch::Receiver<ConnectionMode>,
}

impl AdapterSubscription {
    /// Stop streaming and polling. Safe to call more than once, from any
    /// path, including from inside the callback.
    pub fn cancel(&self) {
        if !self.control.cancel() {
            return;
        }

        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            handle.unsubscribe();
        }

        let client = self.client.lock().take();
        if let Some(client) = client {
            client.disconnect();
        }

        tracing::info!(adapter = self.adapter, "Adapter subscription cancelled");
    }

    /// Current delivery mode.
    #[must_use]
    pub fn mode(&self) -> ConnectionMode {
        *self.mode.borrow()
    }

    /// Receiver notified on every mode change.
    #[must_use]
    pub fn watch_mode(&self) -> watch::Receiver<ConnectionMode> {
        self.mode.clone()
    }

    /// Whether `cancel()` has run.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    /// Whether a stream client was created.
    #[must_use]
    pub fn has_stream(&self) -> bool {
        self.client.lock().is_some()
    }

    /// Adapter label.
    #[must_use]
    pub const fn adapter(&self) -> &'static str {
        self.adapter
    }
}

impl Drop for AdapterSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for AdapterSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSubscription")
            .field("adapter", &self.adapter)
            .field("mode", &self.mode())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Subscribe through the stream, falling back to polling when the stream
/// cannot be created or gives up reconnecting.
///
/// Values that fail to decode are dropped and counted. A panicking
/// `callback` is logged and does not stop delivery.
pub fn subscribe_with_fallback<T, F>(spec: FallbackSpec<T>, callback: F) -> AdapterSubscription
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    let FallbackSpec {
        adapter,
        endpoint,
        config,
        decoders,
        poll,
        poll_interval,
        transport,
    } = spec;

    let (control, mode) = FallbackControl::new();
    let control = Arc::new(control);
    let callback = Arc::new(callback);
    let fallback = Arc::new(Fallback {
        adapter,
        poll,
        interval: poll_interval,
        callback: Arc::clone(&callback),
        control: Arc::clone(&control),
    });

    let subscription = AdapterSubscription {
        adapter,
        client: Mutex::new(None),
        handles: Mutex::new(Vec::new()),
        control: Arc::clone(&control),
        mode,
    };

    let client = match transport {
        Some(transport) => StreamClient::with_transport(endpoint, config, transport),
        None => StreamClient::new(endpoint, config),
    };

    let client = match client {
        Ok(client) => client,
        Err(e) => {
            metrics::record_connection_error(e.kind());
            tracing::warn!(adapter, error = %e, "Stream client could not be created");
            fallback.activate(&e.to_string());
            return subscription;
        }
    };

    let mut handles = Vec::with_capacity(decoders.len() + 2);

    for (event_type, decoder) in decoders {
        let callback = Arc::clone(&callback);
        handles.push(client.subscribe(&event_type, move |envelope| {
            match decoder(&envelope.payload) {
                Ok(values) => {
                    for value in values {
                        deliver(adapter, callback.as_ref(), value);
                    }
                }
                Err(e) => {
                    metrics::record_decode_failure(adapter);
                    tracing::debug!(
                        adapter,
                        event_type = %envelope.event_type,
                        error = %e,
                        "Dropped undecodable frame"
                    );
                }
            }
        }));
    }

    let opened = Arc::clone(&control);
    handles.push(client.on_open(move || opened.stream_opened()));

    let on_failure = Arc::clone(&fallback);
    handles.push(client.on_error(move |err: &StreamError| {
        if err.is_terminal() || matches!(err, StreamError::Construction(_)) {
            on_failure.activate(&err.to_string());
        } else {
            on_failure.control.stream_lost();
        }
    }));

    *subscription.handles.lock() = handles;
    client.connect();
    *subscription.client.lock() = Some(client);

    subscription
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;
    use serde_json::json;

    use super::*;
    use crate::application::ports::{RawFrame, TransportError};
    use crate::domain::market_data::PriceUpdate;
    use crate::infrastructure::adapters::decode;
    use crate::infrastructure::stream::MockTransport;

    const ENDPOINT: &str = "http://localhost:8080/api/market-data/stream";

    fn counting_poll(calls: &Arc<AtomicUsize>) -> PollFn<PriceUpdate> {
        let calls = Arc::clone(calls);
        Arc::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Ok(vec![PriceUpdate {
                    asset: "BTC".to_string(),
                    ..PriceUpdate::default()
                }])
            }
            .boxed()
        })
    }

    fn spec_over(transport: &Arc<MockTransport>, poll: PollFn<PriceUpdate>) -> FallbackSpec<PriceUpdate> {
        let transport: Arc<dyn StreamTransport> = Arc::clone(transport) as Arc<dyn StreamTransport>;
        FallbackSpec::new("market_data", ENDPOINT, poll)
            .with_config(
                StreamClientConfig::default()
                    .with_max_reconnect_attempts(1)
                    .with_reconnect_delay(Duration::from_millis(100))
                    .with_max_jitter(Duration::ZERO),
            )
            .with_decoder("price", decode::single(Some("asset")))
            .with_transport(transport)
    }

    #[tokio::test(start_paused = true)]
    async fn streams_decoded_values() {
        let transport = Arc::new(MockTransport::new());
        let feed = transport.push_open();
        let polls = Arc::new(AtomicUsize::new(0));

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let subscription = subscribe_with_fallback(spec_over(&transport, counting_poll(&polls)), move |update: PriceUpdate| {
            sink.lock().push(update.asset);
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(subscription.mode(), ConnectionMode::Streaming);

        feed.send(RawFrame::new("price", json!({"asset": "ETH", "price": 3200}).to_string()));
        feed.send(RawFrame::new("price", "null"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*received.lock(), vec!["ETH".to_string()]);
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_failure_switches_to_polling() {
        let transport = Arc::new(MockTransport::new());
        let polls = Arc::new(AtomicUsize::new(0));
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);

        let subscription = subscribe_with_fallback(
            spec_over(&transport, counting_poll(&polls)).with_poll_interval(Duration::from_secs(5)),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(transport.open_count(), 2);
        assert_eq!(subscription.mode(), ConnectionMode::Polling);
        assert_eq!(polls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(polls.load(Ordering::SeqCst), 2);
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn construction_failure_polls_and_cancel_stops_it() {
        let polls = Arc::new(AtomicUsize::new(0));
        let spec = FallbackSpec::new("risk", "not a url", counting_poll(&polls))
            .with_poll_interval(Duration::from_secs(5));

        let subscription = subscribe_with_fallback(spec, |_| {});
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!subscription.has_stream());
        assert_eq!(subscription.mode(), ConnectionMode::Polling);
        assert_eq!(polls.load(Ordering::SeqCst), 1);

        subscription.cancel();
        subscription.cancel();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(polls.load(Ordering::SeqCst), 1);
        assert_eq!(subscription.mode(), ConnectionMode::Disconnected);
        assert!(subscription.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn non_terminal_failure_reports_disconnected() {
        let transport = Arc::new(MockTransport::new());
        let feed = transport.push_open();
        let polls = Arc::new(AtomicUsize::new(0));
        let subscription = subscribe_with_fallback(spec_over(&transport, counting_poll(&polls)), |_| {});

        let mut modes = subscription.watch_mode();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*modes.borrow_and_update(), ConnectionMode::Streaming);

        feed.fail(TransportError::Interrupted("reset".to_string()));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(modes.has_changed().unwrap());
        assert_eq!(subscription.mode(), ConnectionMode::Disconnected);
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_callback_keeps_poller_alive() {
        let polls = Arc::new(AtomicUsize::new(0));
        let spec = FallbackSpec::new("risk", "ftp://nowhere", counting_poll(&polls))
            .with_poll_interval(Duration::from_secs(1));

        let _subscription = subscribe_with_fallback(spec, |_: PriceUpdate| panic!("callback bug"));
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn spec_lists_event_types_in_order() {
        let polls = Arc::new(AtomicUsize::new(0));
        let spec = FallbackSpec::new("trading", ENDPOINT, counting_poll(&polls))
            .with_decoder("position", decode::single(Some("symbol")))
            .with_decoder("positions", decode::batch(Some("symbol")));

        assert_eq!(spec.event_types(), vec!["position", "positions"]);
        assert_eq!(spec.adapter(), "trading");
        assert_eq!(spec.endpoint(), ENDPOINT);
    }
}
