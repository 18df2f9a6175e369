//! Prometheus Metrics Module
//!
//! Exposes streaming-layer metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Frames**: Counts of frames received by event type
//! - **Connections**: Open stream connections, connection errors by kind, reconnects
//! - **Delivery**: Handler panics and adapter decode failures
//! - **Fallback**: Poller activations and poll outcomes per adapter
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! is a no-op until [`init_metrics`] installs the recorder.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "dashboard_stream_frames_received_total",
        "Total frames received from push streams"
    );
    describe_gauge!(
        "dashboard_stream_open_connections",
        "Number of push-stream connections currently open"
    );
    describe_counter!(
        "dashboard_stream_connection_errors_total",
        "Total stream connection errors by kind"
    );
    describe_counter!(
        "dashboard_stream_reconnects_total",
        "Total scheduled reconnection attempts"
    );
    describe_counter!(
        "dashboard_stream_handler_panics_total",
        "Total subscriber handlers that panicked during dispatch"
    );
    describe_counter!(
        "dashboard_stream_decode_failures_total",
        "Total frames dropped by adapters because the payload did not decode"
    );
    describe_counter!(
        "dashboard_stream_fallback_activations_total",
        "Total adapter subscriptions that switched to polling"
    );
    describe_counter!(
        "dashboard_stream_polls_total",
        "Total fallback poll requests by outcome"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Outcome label for fallback polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Request succeeded.
    Success,
    /// Request failed.
    Failure,
}

impl PollOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// Record a frame received from a push stream.
pub fn record_frame_received(event_type: &str) {
    counter!(
        "dashboard_stream_frames_received_total",
        "event_type" => event_type.to_string()
    )
    .increment(1);
}

/// Record a connection opening.
pub fn record_connection_opened() {
    gauge!("dashboard_stream_open_connections").increment(1.0);
}

/// Record a connection closing.
pub fn record_connection_closed() {
    gauge!("dashboard_stream_open_connections").decrement(1.0);
}

/// Record a stream error.
pub fn record_connection_error(kind: &'static str) {
    counter!(
        "dashboard_stream_connection_errors_total",
        "kind" => kind
    )
    .increment(1);
}

/// Record a scheduled reconnection attempt.
pub fn record_reconnect() {
    counter!("dashboard_stream_reconnects_total").increment(1);
}

/// Record handlers that panicked during one dispatch.
pub fn record_handler_panics(count: usize) {
    counter!("dashboard_stream_handler_panics_total").increment(count as u64);
}

/// Record a frame dropped by an adapter decoder.
pub fn record_decode_failure(adapter: &'static str) {
    counter!(
        "dashboard_stream_decode_failures_total",
        "adapter" => adapter
    )
    .increment(1);
}

/// Record an adapter switching to polling.
pub fn record_fallback_activation(adapter: &'static str) {
    counter!(
        "dashboard_stream_fallback_activations_total",
        "adapter" => adapter
    )
    .increment(1);
}

/// Record a fallback poll.
pub fn record_poll(adapter: &'static str, outcome: PollOutcome) {
    counter!(
        "dashboard_stream_polls_total",
        "adapter" => adapter,
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_outcome_as_str() {
        assert_eq!(PollOutcome::Success.as_str(), "success");
        assert_eq!(PollOutcome::Failure.as_str(), "failure");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_frame_received("price");
        record_connection_opened();
        record_connection_closed();
        record_connection_error("timeout");
        record_reconnect();
        record_handler_panics(2);
        record_decode_failure("market_data");
        record_fallback_activation("risk");
        record_poll("trading", PollOutcome::Failure);
    }
}
