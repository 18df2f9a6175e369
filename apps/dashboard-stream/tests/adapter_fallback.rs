//! Adapter Fallback Integration Tests
//!
//! Runs the domain adapters against `wiremock` backends: streaming over
//! Server-Sent Events, switching to polling when the stream is refused,
//! and dropping frames that do not decode.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dashboard_stream::infrastructure::adapters::{FallbackSpec, PollFn};
use dashboard_stream::{
    ConnectionMode, DashboardConfig, MarketDataAdapter, OrderStatus, PriceUpdate, RiskAdapter,
    StreamClientConfig, TradingAdapter, subscribe_with_fallback,
};

const WAIT: Duration = Duration::from_secs(5);

fn config_for(server: &MockServer) -> DashboardConfig {
    let base = format!("{}/api", server.uri());
    DashboardConfig::from_lookup(|key| match key {
        "DASHBOARD_API_BASE_URL" => Some(base.clone()),
        "DASHBOARD_STREAM_MAX_RECONNECT_ATTEMPTS" => Some("1".to_string()),
        "DASHBOARD_STREAM_RECONNECT_DELAY_MS" => Some("10".to_string()),
        "DASHBOARD_POLL_INTERVAL_MS" => Some("50".to_string()),
        _ => None,
    })
    .unwrap()
}

fn quick_stream(config: &DashboardConfig) -> StreamClientConfig {
    StreamClientConfig::from_stream_settings(&config.stream)
        .with_reconnect_delay(Duration::from_millis(10))
        .with_max_jitter(Duration::ZERO)
}

async fn mount_sse(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/event-stream"))
        .mount(server)
        .await;
}

async fn mount_unavailable(server: &MockServer, route: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(503))
        .mount(server)
        .await;
}

#[tokio::test]
async fn prices_stream_over_sse() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        "/api/market-data/stream",
        "event: price\ndata: {\"asset\":\"BTC\",\"price\":65000,\"change24h\":\"1.5\"}\n\n",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/market-data/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let adapter = MarketDataAdapter::new(&config)
        .unwrap()
        .with_stream_config(quick_stream(&config).with_max_reconnect_attempts(u32::MAX));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = adapter.subscribe_to_prices(move |update| {
        let _ = tx.send(update);
    });

    let update = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(update.asset, "BTC");
    assert_eq!(update.price, rust_decimal::Decimal::from(65_000));
    assert_eq!(update.change_24h.to_string(), "1.5");

    subscription.cancel();
    assert_eq!(subscription.mode(), ConnectionMode::Disconnected);
}

#[tokio::test]
async fn refused_stream_falls_back_to_polling() {
    let server = MockServer::start().await;
    mount_unavailable(&server, "/api/market-data/stream").await;
    Mock::given(method("GET"))
        .and(path("/api/market-data/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"asset": "BTC", "price": 65000},
            {"asset": "ETH", "price": 3200}
        ])))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let adapter = MarketDataAdapter::new(&config)
        .unwrap()
        .with_stream_config(quick_stream(&config));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = adapter.subscribe_to_prices(move |update: PriceUpdate| {
        let _ = tx.send(update.asset);
    });

    let first = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    let second = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!((first.as_str(), second.as_str()), ("BTC", "ETH"));
    assert_eq!(subscription.mode(), ConnectionMode::Polling);

    subscription.cancel();
    subscription.cancel();
    assert_eq!(subscription.mode(), ConnectionMode::Disconnected);

    // Drain anything already in flight, then expect silence.
    tokio::time::sleep(Duration::from_millis(100)).await;
    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn null_and_malformed_frames_never_reach_callback() {
    let server = MockServer::start().await;
    mount_sse(
        &server,
        "/api/trading/stream",
        concat!(
            "event: position\ndata: null\n\n",
            "event: position\ndata: not json\n\n",
            "event: position\ndata: {\"quantity\":5}\n\n",
            "event: positions\ndata: [{\"symbol\":\"AAPL\"},null]\n\n",
            "event: position\ndata: {\"symbol\":\"MSFT\",\"qty\":\"12\"}\n\n",
        ),
    )
    .await;

    let config = config_for(&server);
    let adapter = TradingAdapter::new(&config)
        .unwrap()
        .with_stream_config(quick_stream(&config).with_max_reconnect_attempts(u32::MAX));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = adapter.subscribe_to_positions(move |position| {
        let _ = tx.send(position);
    });

    let position = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(position.symbol, "MSFT");
    assert_eq!(position.quantity, rust_decimal::Decimal::from(12));

    subscription.cancel();
}

#[tokio::test]
async fn orders_poll_after_stream_gives_up() {
    let server = MockServer::start().await;
    mount_unavailable(&server, "/api/trading/stream").await;
    Mock::given(method("GET"))
        .and(path("/api/trading/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"order_id": "ord-1", "symbol": "AAPL", "status": "partially_filled", "qty": "10"}
        ])))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let adapter = TradingAdapter::new(&config)
        .unwrap()
        .with_stream_config(quick_stream(&config));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = adapter.subscribe_to_orders(move |order| {
        let _ = tx.send(order);
    });

    let order = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(order.order_id, "ord-1");
    assert_eq!(order.status, OrderStatus::PartiallyFilled);
    assert_eq!(subscription.mode(), ConnectionMode::Polling);
}

#[tokio::test]
async fn poll_failures_do_not_stop_the_poller() {
    let server = MockServer::start().await;
    mount_unavailable(&server, "/api/risk/stream").await;
    Mock::given(method("GET"))
        .and(path("/api/risk/metrics"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/risk/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "var95": "1250.50",
            "max_drawdown": "0.12"
        })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let adapter = RiskAdapter::new(&config)
        .unwrap()
        .with_stream_config(quick_stream(&config));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = adapter.subscribe_to_metrics(move |metrics| {
        let _ = tx.send(metrics);
    });

    let metrics = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(metrics.var_95.to_string(), "1250.50");
    assert_eq!(metrics.max_drawdown.to_string(), "0.12");
}

#[tokio::test]
async fn one_shot_fetches_use_rest_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/trading/positions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"symbol": "AAPL", "qty": "10", "avg_entry_price": "187.25"}
        ])))
        .mount(&server)
        .await;

    let adapter = TradingAdapter::new(&config_for(&server)).unwrap();
    let positions = adapter.get_positions().await.unwrap();

    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].average_price.to_string(), "187.25");
}

#[tokio::test(start_paused = true)]
async fn construction_failure_cleanup_clears_poller() {
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&polls);
    let poll: PollFn<PriceUpdate> = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(Vec::new()) }.boxed()
    });

    let spec = FallbackSpec::new("market_data", "::not a url::", poll)
        .with_poll_interval(Duration::from_secs(5));
    let subscription = subscribe_with_fallback(spec, |_: PriceUpdate| {});

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert!(!subscription.has_stream());

    subscription.cancel();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert_eq!(subscription.mode(), ConnectionMode::Disconnected);
}

#[tokio::test]
async fn zero_attempt_limit_polls_after_first_refusal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/market-data/stream"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/market-data/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"asset": "SOL"}])))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let adapter = MarketDataAdapter::new(&config)
        .unwrap()
        .with_stream_config(quick_stream(&config).with_max_reconnect_attempts(0));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = adapter.subscribe_to_prices(move |update: PriceUpdate| {
        let _ = tx.send(update.asset);
    });

    let asset = timeout(WAIT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(asset, "SOL");
    assert_eq!(subscription.mode(), ConnectionMode::Polling);

    subscription.cancel();
}
