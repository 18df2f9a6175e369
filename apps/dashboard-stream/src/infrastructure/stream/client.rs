//! Stream Client
//!
//! Owns one push connection to one endpoint. Inbound frames are decoded
//! into [`MessageEnvelope`]s and routed through the client's own
//! [`SubscriptionRegistry`]; failures go through the reconnection policy.
//!
//! # Lifecycle
//!
//! `connect()` spawns a session task that runs every attempt, frame and
//! backoff timer for this client sequentially. Nothing here returns errors
//! after construction: connection failures, timeouts and drops are reported
//! to the error hooks, and `MaxReconnectAttempts` is reported exactly once
//! when the policy gives up.
//!
//! `disconnect()` is terminal for the instance. It cancels the session,
//! which drops any pending attempt, open transport or backoff timer, and
//! may be called from inside a handler or hook.
//!
//! # Locking
//!
//! `control` is always taken before `state`. No lock is held while user
//! handlers or hooks run.

use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use reqwest::Url;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use super::timeout::ConnectionTimeoutGuard;
use crate::StreamSettings;
use crate::application::ports::{FrameStream, RawFrame, StreamTransport, TransportError};
use crate::domain::connection::ConnectionState;
use crate::domain::envelope::{DEFAULT_EVENT_TYPE, MessageEnvelope};
use crate::domain::subscription::{SubscriptionHandle, SubscriptionRegistry, panic_message};
use crate::infrastructure::metrics;
use crate::infrastructure::sse::{CredentialsMode, SseTransport};

// =============================================================================
// Configuration
// =============================================================================

/// Construction-time settings for a [`StreamClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct StreamClientConfig {
    /// Reconnection attempts per failure run before giving up; 0 gives up on the first failure.
    pub max_reconnect_attempts: u32,
    /// Base delay of the backoff schedule.
    pub reconnect_delay: Duration,
    /// Upper bound on any backoff delay.
    pub max_reconnect_delay: Duration,
    /// Budget for a single attempt to reach `Open`.
    pub connection_timeout: Duration,
    /// Largest random jitter added to a backoff delay.
    pub max_jitter: Duration,
    /// Cookie handling for the HTTP transport.
    pub credentials: CredentialsMode,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(1000),
            max_reconnect_delay: Duration::from_millis(30_000),
            connection_timeout: Duration::from_millis(30_000),
            max_jitter: Duration::from_millis(1000),
            credentials: CredentialsMode::Omit,
        }
    }
}

impl StreamClientConfig {
    /// Build from environment-derived stream settings.
    #[must_use]
    pub const fn from_stream_settings(settings: &StreamSettings) -> Self {
        Self {
            max_reconnect_attempts: settings.max_reconnect_attempts,
            reconnect_delay: settings.reconnect_delay,
            max_reconnect_delay: settings.max_reconnect_delay,
            connection_timeout: settings.connection_timeout,
            max_jitter: Duration::from_millis(1000),
            credentials: CredentialsMode::from_flag(settings.with_credentials),
        }
    }

    /// Set the attempt limit.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the base backoff delay.
    #[must_use]
    pub const fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the jitter bound.
    #[must_use]
    pub const fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    /// Backoff settings for the reconnection policy.
    #[must_use]
    pub const fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig::new(
            self.reconnect_delay,
            self.max_reconnect_delay,
            2.0,
            self.max_jitter,
            self.max_reconnect_attempts,
        )
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Failures surfaced by a stream client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamError {
    /// The endpoint is not an absolute http(s) URL.
    #[error("invalid stream endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as given.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The transport could not be created at all.
    #[error("stream could not be created: {0}")]
    Construction(String),

    /// An attempt did not reach `Open` within the connection timeout.
    #[error("connection not established within {}ms", .0.as_millis())]
    ConnectionTimeout(Duration),

    /// An attempt failed before reaching `Open`.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An open connection dropped.
    #[error("connection lost: {0}")]
    Disconnected(String),

    /// The reconnection policy gave up.
    #[error("maximum reconnection attempts ({0}) reached")]
    MaxReconnectAttempts(u32),
}

impl StreamError {
    /// Whether no further reconnection will be attempted for this session.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::MaxReconnectAttempts(_))
    }

    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidEndpoint { .. } => "invalid_endpoint",
            Self::Construction(_) => "construction",
            Self::ConnectionTimeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Disconnected(_) => "disconnected",
            Self::MaxReconnectAttempts(_) => "max_attempts",
        }
    }
}

// =============================================================================
// Lifecycle Hooks
// =============================================================================

/// Hook invoked for every reported error.
pub type ErrorHook = Arc<dyn Fn(&StreamError) + Send + Sync>;

/// Hook invoked on open or close.
pub type LifecycleHook = Arc<dyn Fn() + Send + Sync>;

struct HookList<H> {
    hooks: Arc<Mutex<HashMap<u64, H>>>,
    next_id: AtomicU64,
}

impl<H: Clone + Send + 'static> HookList<H> {
    fn new() -> Self {
        Self {
            hooks: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    fn add(&self, hook: H) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.hooks.lock().insert(id, hook);

        let hooks: Weak<Mutex<HashMap<u64, H>>> = Arc::downgrade(&self.hooks);
        SubscriptionHandle::new(move || {
            if let Some(hooks) = hooks.upgrade() {
                hooks.lock().remove(&id);
            }
        })
    }

    fn snapshot(&self) -> Vec<H> {
        self.hooks.lock().values().cloned().collect()
    }
}

fn run_hook(client_id: Uuid, hook: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(hook)) {
        metrics::record_handler_panics(1);
        tracing::error!(
            %client_id,
            panic = panic_message(panic.as_ref()),
            "Stream lifecycle hook panicked"
        );
    }
}

// =============================================================================
// Stream Client
// =============================================================================

/// Resilient client for one push-stream endpoint.
///
/// Dropping the client disconnects it.
///
/// # Example
///
/// ```rust,no_run
/// use dashboard_stream::infrastructure::stream::{StreamClient, StreamClientConfig};
///
/// # async fn run() -> Result<(), dashboard_stream::infrastructure::stream::StreamError> {
/// let client = StreamClient::new(
///     "http://localhost:8080/api/market-data/stream",
///     StreamClientConfig::default(),
/// )?;
///
/// let _prices = client.subscribe("price", |envelope| {
///     println!("{}", envelope.raw);
/// });
/// client.connect();
/// # Ok(())
/// # }
/// ```
pub struct StreamClient {
    inner: Arc<ClientInner>,
}

impl StreamClient {
    /// Create a client using the Server-Sent Events transport.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::InvalidEndpoint` for anything but an absolute
    /// http(s) URL, and `StreamError::Construction` if the HTTP client
    /// cannot be built.
    pub fn new(endpoint: impl Into<String>, config: StreamClientConfig) -> Result<Self, StreamError> {
        let endpoint = endpoint.into();
        validate_endpoint(&endpoint)?;

        let transport = SseTransport::new(config.credentials)
            .map_err(|e| StreamError::Construction(e.to_string()))?;

        Ok(Self::build(endpoint, config, Arc::new(transport)))
    }

    /// Create a client over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Returns `StreamError::InvalidEndpoint` for anything but an absolute
    /// http(s) URL.
    pub fn with_transport(
        endpoint: impl Into<String>,
        config: StreamClientConfig,
        transport: Arc<dyn StreamTransport>,
    ) -> Result<Self, StreamError> {
        let endpoint = endpoint.into();
        validate_endpoint(&endpoint)?;
        Ok(Self::build(endpoint, config, transport))
    }

    fn build(endpoint: String, config: StreamClientConfig, transport: Arc<dyn StreamTransport>) -> Self {
        let client_id = Uuid::new_v4();
        tracing::debug!(%client_id, endpoint, "Stream client created");

        Self {
            inner: Arc::new(ClientInner {
                client_id,
                endpoint,
                config,
                transport,
                registry: SubscriptionRegistry::new(),
                error_hooks: HookList::new(),
                open_hooks: HookList::new(),
                close_hooks: HookList::new(),
                state: RwLock::new(ConnectionState::Idle),
                attempts: AtomicU32::new(0),
                control: Mutex::new(Control::default()),
            }),
        }
    }

    /// Start connecting. No-op while a session is already running, and
    /// after an explicit `disconnect()`.
    pub fn connect(&self) {
        let inner = &self.inner;

        let started = {
            let mut control = inner.control.lock();

            if control.manually_stopped {
                tracing::warn!(
                    client_id = %inner.client_id,
                    "connect() ignored: client was disconnected"
                );
                return;
            }
            if control.session.is_some() {
                tracing::debug!(client_id = %inner.client_id, "connect() ignored: already connecting");
                return;
            }

            match Handle::try_current() {
                Ok(runtime) => {
                    let (generation, cancel) = control.begin_session();
                    *inner.state.write() = ConnectionState::Connecting;
                    inner.attempts.store(0, Ordering::Relaxed);
                    runtime.spawn(run_session(Arc::clone(inner), generation, cancel));
                    Ok(())
                }
                Err(e) => Err(StreamError::Construction(e.to_string())),
            }
        };

        if let Err(err) = started {
            tracing::error!(client_id = %inner.client_id, error = %err, "Stream client could not start");
            inner.report_error(&err);
        }
    }

    /// Stop for good: cancel any attempt, connection or pending reconnect,
    /// then fire close hooks.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Register a handler for an event type.
    ///
    /// While the connection is open, a listener for a type not seen before
    /// is bound immediately.
    pub fn subscribe<F>(&self, event_type: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&MessageEnvelope) + Send + Sync + 'static,
    {
        let handle = self.inner.registry.register(event_type, Arc::new(handler));

        let mut control = self.inner.control.lock();
        if *self.inner.state.read() == ConnectionState::Open
            && control.bound_types.insert(event_type.to_string())
        {
            tracing::debug!(
                client_id = %self.inner.client_id,
                event_type,
                "Bound listener for event type"
            );
        }

        handle
    }

    /// Register a hook for reported errors.
    pub fn on_error<F>(&self, hook: F) -> SubscriptionHandle
    where
        F: Fn(&StreamError) + Send + Sync + 'static,
    {
        self.inner.error_hooks.add(Arc::new(hook))
    }

    /// Register a hook for every successful open.
    pub fn on_open<F>(&self, hook: F) -> SubscriptionHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.open_hooks.add(Arc::new(hook))
    }

    /// Register a hook for `disconnect()`.
    pub fn on_close<F>(&self, hook: F) -> SubscriptionHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.close_hooks.add(Arc::new(hook))
    }

    /// Whether the connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Open
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Reconnection attempts handed out in the current failure run.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::Relaxed)
    }

    /// Identifier used in logs.
    #[must_use]
    pub fn client_id(&self) -> Uuid {
        self.inner.client_id
    }

    /// Endpoint this client connects to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.inner.disconnect();
    }
}

impl std::fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamClient")
            .field("client_id", &self.inner.client_id)
            .field("endpoint", &self.inner.endpoint)
            .field("state", &self.connection_state())
            .finish_non_exhaustive()
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), StreamError> {
    let invalid = |reason: String| StreamError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

// =============================================================================
// Shared State
// =============================================================================

#[derive(Default)]
struct Control {
    manually_stopped: bool,
    session: Option<Session>,
    generation: u64,
    bound_types: HashSet<String>,
}

struct Session {
    generation: u64,
    cancel: CancellationToken,
}

impl Control {
    fn begin_session(&mut self) -> (u64, CancellationToken) {
        self.generation += 1;
        let cancel = CancellationToken::new();
        self.session = Some(Session {
            generation: self.generation,
            cancel: cancel.clone(),
        });
        (self.generation, cancel)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.generation == generation)
    }
}

struct ClientInner {
    client_id: Uuid,
    endpoint: String,
    config: StreamClientConfig,
    transport: Arc<dyn StreamTransport>,
    registry: SubscriptionRegistry,
    error_hooks: HookList<ErrorHook>,
    open_hooks: HookList<LifecycleHook>,
    close_hooks: HookList<LifecycleHook>,
    state: RwLock<ConnectionState>,
    attempts: AtomicU32,
    control: Mutex<Control>,
}

enum Attempt {
    Opened(FrameStream),
    Failed(StreamError),
    Cancelled,
}

enum Raced {
    Settled(Result<FrameStream, TransportError>),
    TimedOut,
    Cancelled,
}

impl ClientInner {
    fn disconnect(&self) {
        let first = {
            let mut control = self.control.lock();
            let first = !control.manually_stopped;
            control.manually_stopped = true;
            if let Some(session) = control.session.take() {
                session.cancel.cancel();
            }
            control.bound_types.clear();
            *self.state.write() = ConnectionState::Closed;
            first
        };

        if first {
            tracing::info!(client_id = %self.client_id, endpoint = %self.endpoint, "Stream client disconnected");
            for hook in self.close_hooks.snapshot() {
                run_hook(self.client_id, || hook());
            }
        }
    }

    fn report_error(&self, err: &StreamError) {
        metrics::record_connection_error(err.kind());
        for hook in self.error_hooks.snapshot() {
            run_hook(self.client_id, || hook(err));
        }
    }

    /// Write `state` if `generation` is still the live session.
    fn set_state_if_current(&self, generation: u64, state: ConnectionState) -> bool {
        let control = self.control.lock();
        if !control.is_current(generation) {
            return false;
        }
        *self.state.write() = state;
        true
    }

    /// Mark the session open and bind listeners: the default type plus
    /// every type that already has handlers.
    fn mark_open(&self, generation: u64) -> bool {
        let mut control = self.control.lock();
        if !control.is_current(generation) {
            return false;
        }

        control.bound_types.clear();
        control.bound_types.insert(DEFAULT_EVENT_TYPE.to_string());
        control.bound_types.extend(self.registry.event_types());
        *self.state.write() = ConnectionState::Open;
        true
    }

    /// End the session after the policy gave up.
    fn finish_session(&self, generation: u64) -> bool {
        let mut control = self.control.lock();
        if !control.is_current(generation) {
            return false;
        }

        control.session = None;
        control.bound_types.clear();
        *self.state.write() = ConnectionState::Closed;
        true
    }

    async fn attempt(&self, cancel: &CancellationToken) -> Attempt {
        tracing::debug!(client_id = %self.client_id, endpoint = %self.endpoint, "Opening stream connection");

        let guard = ConnectionTimeoutGuard::arm(self.config.connection_timeout);
        let mut open = self.transport.open(&self.endpoint);

        let raced = tokio::select! {
            biased;
            () = cancel.cancelled() => Raced::Cancelled,
            result = &mut open => Raced::Settled(result),
            () = guard.expired() => Raced::TimedOut,
        };
        drop(open);

        match raced {
            Raced::Cancelled => Attempt::Cancelled,
            Raced::TimedOut => {
                tracing::warn!(
                    client_id = %self.client_id,
                    timeout_ms = guard.duration().as_millis(),
                    "Stream connection timed out; half-open transport closed"
                );
                Attempt::Failed(StreamError::ConnectionTimeout(guard.duration()))
            }
            Raced::Settled(Ok(frames)) if guard.disarm() => Attempt::Opened(frames),
            Raced::Settled(Ok(_)) => {
                Attempt::Failed(StreamError::ConnectionTimeout(guard.duration()))
            }
            Raced::Settled(Err(e)) => {
                guard.disarm();
                tracing::warn!(client_id = %self.client_id, error = %e, "Stream connection failed");
                Attempt::Failed(StreamError::Transport(e))
            }
        }
    }

    /// Deliver frames until the connection drops (`Some`) or the session
    /// is cancelled (`None`).
    async fn pump(&self, mut frames: FrameStream, cancel: &CancellationToken) -> Option<StreamError> {
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return None,
                next = frames.next() => next,
            };

            match next {
                Some(Ok(frame)) => self.deliver(frame),
                Some(Err(e)) => return Some(StreamError::Disconnected(e.to_string())),
                None => return Some(StreamError::Disconnected("stream ended".to_string())),
            }
        }
    }

    fn deliver(&self, frame: RawFrame) {
        let event_type = frame
            .event_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string());

        if !self.control.lock().bound_types.contains(&event_type) {
            tracing::trace!(
                client_id = %self.client_id,
                event_type = %event_type,
                "Frame for unbound event type ignored"
            );
            return;
        }

        metrics::record_frame_received(&event_type);

        let envelope = MessageEnvelope::from_frame(Some(&event_type), frame.data, frame.id);
        let outcome = self.registry.dispatch(&event_type, &envelope);
        if outcome.failed > 0 {
            metrics::record_handler_panics(outcome.failed);
        }
    }
}

// =============================================================================
// Session Task
// =============================================================================

async fn run_session(inner: Arc<ClientInner>, generation: u64, cancel: CancellationToken) {
    let mut policy = ReconnectPolicy::new(inner.config.reconnect_config());

    loop {
        let failure = match inner.attempt(&cancel).await {
            Attempt::Cancelled => return,
            Attempt::Failed(err) => err,
            Attempt::Opened(frames) => {
                if !inner.mark_open(generation) {
                    return;
                }
                policy.reset();
                inner.attempts.store(0, Ordering::Relaxed);
                metrics::record_connection_opened();
                tracing::info!(client_id = %inner.client_id, endpoint = %inner.endpoint, "Stream connection open");

                for hook in inner.open_hooks.snapshot() {
                    run_hook(inner.client_id, || hook());
                }

                let dropped = inner.pump(frames, &cancel).await;
                metrics::record_connection_closed();

                match dropped {
                    Some(err) => {
                        tracing::warn!(client_id = %inner.client_id, error = %err, "Stream connection lost");
                        err
                    }
                    None => return,
                }
            }
        };

        if !inner.set_state_if_current(generation, ConnectionState::Closed) {
            return;
        }
        inner.report_error(&failure);

        if let Some(delay) = policy.next_delay() {
            if !inner.set_state_if_current(generation, ConnectionState::Connecting) {
                return;
            }
            inner.attempts.store(policy.attempt_count(), Ordering::Relaxed);
            metrics::record_reconnect();
            tracing::info!(
                client_id = %inner.client_id,
                attempt = policy.attempt_count(),
                delay_ms = delay.as_millis(),
                "Scheduling stream reconnection"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
        } else {
            let max_attempts = policy.config().max_attempts;
            if inner.finish_session(generation) {
                tracing::error!(
                    client_id = %inner.client_id,
                    endpoint = %inner.endpoint,
                    max_attempts,
                    "Stream reconnection attempts exhausted"
                );
                inner.report_error(&StreamError::MaxReconnectAttempts(max_attempts));
            }
            return;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::infrastructure::stream::mock::MockTransport;

    fn fast_config(max_attempts: u32) -> StreamClientConfig {
        StreamClientConfig::default()
            .with_max_reconnect_attempts(max_attempts)
            .with_reconnect_delay(Duration::from_millis(1000))
            .with_max_jitter(Duration::ZERO)
    }

    fn client_with(transport: &Arc<MockTransport>, config: StreamClientConfig) -> StreamClient {
        let transport: Arc<dyn StreamTransport> = Arc::clone(transport) as Arc<dyn StreamTransport>;
        StreamClient::with_transport("http://localhost:8080/api/stream", config, transport).unwrap()
    }

    #[test]
    fn invalid_endpoints_are_rejected() {
        for endpoint in ["not a url", "ftp://example.com/stream", "/relative/path"] {
            let err = StreamClient::new(endpoint, StreamClientConfig::default()).unwrap_err();
            assert!(matches!(err, StreamError::InvalidEndpoint { .. }), "{endpoint}");
        }
    }

    #[test]
    fn connect_without_runtime_reports_construction_error() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(&transport, fast_config(1));
        let errors = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&errors);
        let _hook = client.on_error(move |err| sink.lock().push(err.kind()));

        client.connect();

        assert_eq!(*errors.lock(), vec!["construction"]);
        assert_eq!(client.connection_state(), ConnectionState::Idle);
    }

    #[test]
    fn error_kinds_and_terminality() {
        assert!(StreamError::MaxReconnectAttempts(3).is_terminal());
        assert!(!StreamError::ConnectionTimeout(Duration::from_secs(1)).is_terminal());
        assert!(!StreamError::Disconnected("eof".to_string()).is_terminal());
        assert_eq!(
            StreamError::Transport(TransportError::Rejected("404".to_string())).kind(),
            "transport"
        );
        assert_eq!(
            StreamError::ConnectionTimeout(Duration::from_millis(1500)).to_string(),
            "connection not established within 1500ms"
        );
    }

    #[test]
    fn config_maps_onto_reconnect_policy() {
        let config = fast_config(7).with_connection_timeout(Duration::from_secs(5));
        let reconnect = config.reconnect_config();

        assert_eq!(reconnect.max_attempts, 7);
        assert_eq!(reconnect.initial_delay, Duration::from_millis(1000));
        assert_eq!(reconnect.max_delay, Duration::from_millis(30_000));
        assert_eq!(reconnect.max_jitter, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn open_hooks_fire_and_state_is_open() {
        let transport = Arc::new(MockTransport::new());
        let _feed = transport.push_open();
        let client = client_with(&transport, fast_config(1));

        let opens = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opens);
        let _hook = client.on_open(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.connect();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(client.is_connected());
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_connect_is_noop() {
        let transport = Arc::new(MockTransport::new());
        let _feed = transport.push_open();
        let client = client_with(&transport, fast_config(1));

        client.connect();
        client.connect();
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.connect();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_hooks_fire_once() {
        let transport = Arc::new(MockTransport::new());
        let client = client_with(&transport, fast_config(1));

        let closes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closes);
        let _hook = client.on_close(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.disconnect();
        client.disconnect();

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(client.connection_state(), ConnectionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_after_disconnect_is_ignored() {
        let transport = Arc::new(MockTransport::new());
        let _feed = transport.push_open();
        let client = client_with(&transport, fast_config(1));

        client.disconnect();
        client.connect();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(transport.open_count(), 0);
        assert_eq!(client.connection_state(), ConnectionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn unbound_event_types_are_ignored() {
        let transport = Arc::new(MockTransport::new());
        let feed = transport.push_open();
        let client = client_with(&transport, fast_config(1));

        let messages = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&messages);
        let _default = client.subscribe(DEFAULT_EVENT_TYPE, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        client.connect();
        tokio::time::sleep(Duration::from_millis(10)).await;

        feed.send(RawFrame::new("heartbeat", "{}"));
        feed.send(RawFrame {
            data: "hello".to_string(),
            ..RawFrame::default()
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(messages.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribed_error_hook_is_not_called() {
        let transport = Arc::new(MockTransport::new());
        transport.push_refusal(TransportError::ConnectionFailed("refused".to_string()));
        let client = client_with(&transport, fast_config(1));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let hook = client.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        hook.unsubscribe();

        client.connect();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
