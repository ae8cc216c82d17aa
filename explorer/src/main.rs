use axum::{
    extract::State,
    http::{HeaderName, Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use account_explorer::config::Config;
use account_explorer::indexer::IndexerClient;
use account_explorer::ledger::HttpLedgerClient;
use account_explorer::metrics;
use account_explorer::node::NodeClient;
use account_explorer::registry::FeedRegistry;
use account_explorer::routes::{
    feed_routes, get_account_overview, get_transaction_sender, ExplorerState,
};

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub indexer: IndexerClient,
    pub node: NodeClient,
    pub registry: FeedRegistry,
    pub ledger: Arc<HttpLedgerClient>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

// Allow extracting ExplorerState from AppState
impl axum::extract::FromRef<AppState> for ExplorerState {
    fn from_ref(app_state: &AppState) -> Self {
        ExplorerState {
            registry: app_state.registry.clone(),
            ledger: app_state.ledger.clone(),
            holdings_limit: app_state.config.holdings_limit,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    checks: ReadinessChecks,
}

#[derive(Serialize)]
struct ReadinessChecks {
    indexer: bool,
    node: bool,
}

async fn healthz() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics_handle.render()
}

async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let (indexer_ok, node_ok) = tokio::join!(state.indexer.ping(), state.node.healthy());

    if !indexer_ok {
        warn!("Indexer readiness check failed");
    }
    if !node_ok {
        warn!("Node readiness check failed");
    }

    // The feed survives on the node alone, so only the node gates readiness.
    let status_code = if node_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ReadyResponse {
            status: if node_ok { "ready" } else { "not_ready" },
            checks: ReadinessChecks {
                indexer: indexer_ok,
                node: node_ok,
            },
        }),
    )
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("hyper=warn".parse().expect("static directive"))
        .add_directive("tower_http=debug".parse().expect("static directive"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .json(),
        )
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_logging();

    let config = Config::from_env()?;
    let addr = config
        .socket_addr()
        .map_err(|e| anyhow::anyhow!("Server configuration error: {}", e))?;
    let network = config
        .network()
        .map_err(|e| anyhow::anyhow!("Network configuration error: {}", e))?;
    let indexer_url = config
        .indexer_endpoint()
        .map_err(|e| anyhow::anyhow!("Indexer configuration error: {}", e))?;
    let node_url = config
        .node_endpoint()
        .map_err(|e| anyhow::anyhow!("Node configuration error: {}", e))?;
    let feed_settings = config
        .feed_settings()
        .map_err(|e| anyhow::anyhow!("Feed configuration error: {}", e))?;

    info!("Initializing metrics...");
    let metrics_handle = metrics::init_metrics()?;
    info!("Metrics initialized");

    info!("Starting account explorer");
    info!(host = %config.server_host, port = %config.server_port, "Server configuration");
    info!(%network, %indexer_url, %node_url, "Upstream endpoints");
    info!(
        page_size = feed_settings.page_size,
        rest_page_size = feed_settings.rest_page_size,
        rest_high_volume_threshold = feed_settings.rest_high_volume_threshold,
        "Feed pagination"
    );

    let indexer = IndexerClient::new(indexer_url, config.upstream_timeout(), config.api_key.clone())?;
    let node = NodeClient::new(node_url, config.upstream_timeout(), config.api_key.clone())?;
    info!("Upstream clients initialized");

    let registry = FeedRegistry::new(
        Arc::new(indexer.clone()),
        Arc::new(node.clone()),
        feed_settings,
        config.max_open_feeds,
    );
    let ledger = Arc::new(HttpLedgerClient::new(node.clone(), indexer.clone()));

    let state = AppState {
        config: Arc::new(config),
        indexer,
        node,
        registry: registry.clone(),
        ledger,
        metrics_handle,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_endpoint))
        .route("/v1/accounts/:address", get(get_account_overview))
        .route("/v1/transactions/:version/sender", get(get_transaction_sender))
        .nest("/v1/feeds", feed_routes())
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let request_id = request
                        .headers()
                        .get(&X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");

                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_response(|response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status = %response.status().as_u16(),
                        latency_ms = %latency.as_millis(),
                        "response"
                    );
                })
                .on_failure(|error: tower_http::classify::ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                    tracing::error!(
                        error = %error,
                        latency_ms = %latency.as_millis(),
                        "request failed"
                    );
                }),
        )
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Closing open feeds...");
    registry.clear().await;

    info!("Shutdown complete");
    Ok(())
}
