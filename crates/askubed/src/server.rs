//! HTTP server for askubed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cluster::ClusterClient;
use crate::config::Config;
use crate::llm::LanguageModel;
use crate::routes;

/// Application state shared across handlers.
///
/// The two client handles are the only cross-request state. Either may be
/// `None` when initialization failed at startup; requests needing that
/// client then answer 500 instead of taking the daemon down.
pub struct AppState {
    pub cluster: Option<Arc<dyn ClusterClient>>,
    pub llm: Option<Arc<dyn LanguageModel>>,
    pub config: Config,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Config,
        cluster: Option<Arc<dyn ClusterClient>>,
        llm: Option<Arc<dyn LanguageModel>>,
    ) -> Self {
        Self {
            cluster,
            llm,
            config,
            start_time: Instant::now(),
        }
    }
}

/// Build the router; split out so contract tests can drive it directly.
pub fn router(state: Arc<AppState>) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .merge(routes::query_routes())
        .merge(routes::connection_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}

/// Run the HTTP server until the process is stopped.
pub async fn run(state: AppState) -> Result<()> {
    let state = Arc::new(state);
    let addr = state.config.server.bind_addr.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
