//! Dashboard Stream Monitor Binary
//!
//! Subscribes to prices, positions, orders and risk metrics through the
//! resilient streaming layer and logs what arrives. Reports each
//! subscription's delivery mode on the health endpoint.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin dashboard-stream
//! ```
//!
//! # Environment Variables
//!
//! - `DASHBOARD_API_BASE_URL`: Common API base (default: <http://localhost:8080/api>)
//! - `DASHBOARD_MARKET_DATA_URL`, `DASHBOARD_TRADING_URL`, `DASHBOARD_RISK_URL`:
//!   Per-service overrides
//! - `DASHBOARD_STREAM_MAX_RECONNECT_ATTEMPTS`: Attempts before polling (default: 10)
//! - `DASHBOARD_STREAM_RECONNECT_DELAY_MS`: Base backoff delay (default: 2000)
//! - `DASHBOARD_STREAM_MAX_RECONNECT_DELAY_MS`: Backoff cap (default: 30000)
//! - `DASHBOARD_STREAM_CONNECTION_TIMEOUT_MS`: Open budget (default: 30000)
//! - `DASHBOARD_STREAM_WITH_CREDENTIALS`: Send cookies (default: false)
//! - `DASHBOARD_POLL_INTERVAL_MS`: Fallback poll interval (default: 5000)
//! - `DASHBOARD_REQUEST_TIMEOUT_MS`: Poll request timeout (default: 10000)
//! - `DASHBOARD_HEALTH_PORT`: Health check HTTP port, 0 disables (default: 8083)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: dashboard-stream)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use dashboard_stream::infrastructure::adapters::{
    AdapterSubscription, MarketDataAdapter, RiskAdapter, TradingAdapter,
};
use dashboard_stream::infrastructure::health::{HealthServer, HealthServerState};
use dashboard_stream::infrastructure::telemetry;
use dashboard_stream::{DashboardConfig, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting dashboard stream monitor");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics();

    let config = DashboardConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
    ));

    let market_data = MarketDataAdapter::new(&config)?;
    let trading = TradingAdapter::new(&config)?;
    let risk = RiskAdapter::new(&config)?;

    let subscriptions: Vec<(&str, AdapterSubscription)> = vec![
        (
            "prices",
            market_data.subscribe_to_prices(|update| {
                tracing::debug!(asset = %update.asset, price = %update.price, "Price update");
            }),
        ),
        (
            "positions",
            trading.subscribe_to_positions(|position| {
                tracing::debug!(
                    symbol = %position.symbol,
                    quantity = %position.quantity,
                    unrealized_pnl = %position.unrealized_pnl,
                    "Position update"
                );
            }),
        ),
        (
            "orders",
            trading.subscribe_to_orders(|order| {
                tracing::debug!(
                    order_id = %order.order_id,
                    symbol = %order.symbol,
                    status = ?order.status,
                    "Order update"
                );
            }),
        ),
        (
            "risk_metrics",
            risk.subscribe_to_metrics(|metrics| {
                tracing::debug!(
                    var_95 = %metrics.var_95,
                    max_drawdown = %metrics.max_drawdown,
                    "Risk metrics update"
                );
            }),
        ),
    ];

    for (name, subscription) in &subscriptions {
        health_state.register(*name, subscription.watch_mode());
    }

    let health_handle = if config.server.health_port == 0 {
        tracing::info!("Health server disabled");
        None
    } else {
        let server = HealthServer::new(
            config.server.health_port,
            Arc::clone(&health_state),
            shutdown_token.clone(),
        );
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                tracing::error!(error = %e, "Health server failed");
            }
        }))
    };

    await_shutdown(shutdown_token.clone()).await;

    for (name, subscription) in &subscriptions {
        tracing::debug!(subscription = name, mode = subscription.mode().as_str(), "Cancelling");
        subscription.cancel();
    }

    if let Some(handle) = health_handle
        && tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err()
    {
        tracing::warn!("Health server did not stop in time");
    }

    tracing::info!("Dashboard stream monitor stopped");
    Ok(())
}

fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &DashboardConfig) {
    tracing::info!(
        api_base_url = %config.api_base_url,
        max_reconnect_attempts = config.stream.max_reconnect_attempts,
        poll_interval_ms = config.polling.interval.as_millis(),
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(
        market_data = %config.services.market_data,
        trading = %config.services.trading,
        risk = %config.services.risk,
        "Service endpoints"
    );
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
