use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Histogram;
use prometheus::HistogramOpts;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    pub static ref LIVE_INSTANCES: IntGauge =
        IntGauge::new("broker_live_instances", "Instances currently held by the registry")
            .expect("metric can not be created");

    pub static ref ACTIVE_SESSIONS: IntGauge =
        IntGauge::new("broker_active_sessions", "Client sessions currently attached")
            .expect("metric can not be created");

    pub static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("broker_requests_total", "Requests handled, by operation and outcome"),
        &["operation", "outcome"]
    )
    .expect("metric can not be created");

    pub static ref EVENTS_ROUTED: IntCounter =
        IntCounter::new("broker_events_routed_total", "Property change events pushed to a session")
            .expect("metric can not be created");

    pub static ref EVENTS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("broker_events_dropped_total", "Property change events not delivered"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref ACTION_LATENCY_MS: Histogram = Histogram::with_opts(
        HistogramOpts::new("broker_action_latency_ms", "Action execution latency in ms")
            .buckets(exponential_buckets(0.05, 2.0, 16).expect("valid buckets"))
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        registry.register(Box::new(LIVE_INSTANCES.clone())).expect("collector can be registered");
        registry.register(Box::new(ACTIVE_SESSIONS.clone())).expect("collector can be registered");
        registry.register(Box::new(REQUESTS_TOTAL.clone())).expect("collector can be registered");
        registry.register(Box::new(EVENTS_ROUTED.clone())).expect("collector can be registered");
        registry.register(Box::new(EVENTS_DROPPED.clone())).expect("collector can be registered");
        registry.register(Box::new(ACTION_LATENCY_MS.clone())).expect("collector can be registered");
        registry
    };
}

/// Serves `/metrics` until the shutdown signal fires.
pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!(port, "Prometheus exporter listening");
    let (_, server) = warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
        let _ = shutdown_signal.changed().await;
    });
    server.await;
}

async fn metrics_handler() -> std::result::Result<impl Reply, Rejection> {
    Ok(encode_metrics())
}

/// Text exposition of every broker collector
pub fn encode_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode broker metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("broker metrics could not be from_utf8'd: {}", e);
        String::default()
    })
}
