//! API routes for askubed.

use std::sync::Arc;

use askube_shared::{
    AskubeError, ErrorResponse, HealthResponse, NamespacesResponse, QueryRequest, QueryResponse,
    VERSION,
};
use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, warn};

use crate::pipeline::QueryPipeline;
use crate::server::AppState;

type AppStateArc = Arc<AppState>;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: &AskubeError) -> ApiError {
    let status = StatusCode::from_u16(err.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Query Routes
// ============================================================================

pub fn query_routes() -> Router<AppStateArc> {
    Router::new().route("/query", post(create_query))
}

async fn create_query(
    State(state): State<AppStateArc>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected request body: {}", rejection.body_text());
            return Err(error_response(&AskubeError::Input(format!(
                "invalid JSON body: {}",
                rejection.body_text()
            ))));
        }
    };

    // validate before any stage runs
    let query = match request.query.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => {
            warn!("Rejected request without a query");
            return Err(error_response(&AskubeError::Input(
                "no query provided".to_string(),
            )));
        }
    };

    info!("Received query: {}", query);

    let llm = state.llm.clone().ok_or_else(|| {
        warn!("Query refused: language-model client not initialized");
        error_response(&AskubeError::ClientUnavailable(
            "language-model client not initialized".to_string(),
        ))
    })?;
    let cluster = state.cluster.clone().ok_or_else(|| {
        warn!("Query refused: cluster client not initialized");
        error_response(&AskubeError::ClientUnavailable(
            "cluster client not initialized".to_string(),
        ))
    })?;

    let mut pipeline = QueryPipeline::new(&state.config.llm);
    match pipeline.run(llm.as_ref(), cluster.as_ref(), &query).await {
        Ok(answer) => Ok(Json(QueryResponse { query, answer })),
        Err(e) => Err(error_response(&e)),
    }
}

// ============================================================================
// Connection Routes
// ============================================================================

pub fn connection_routes() -> Router<AppStateArc> {
    Router::new().route("/test_connection", get(test_connection))
}

async fn test_connection(
    State(state): State<AppStateArc>,
) -> Result<Json<NamespacesResponse>, ApiError> {
    let cluster = state.cluster.clone().ok_or_else(|| {
        warn!("Connection check refused: cluster client not initialized");
        error_response(&AskubeError::ClientUnavailable(
            "cluster client not initialized".to_string(),
        ))
    })?;

    match cluster.namespaces().await {
        Ok(namespaces) => {
            info!("Connection check listed {} namespaces", namespaces.len());
            Ok(Json(NamespacesResponse { namespaces }))
        }
        Err(e) => {
            let err = AskubeError::from(e);
            warn!("Connection check failed: {}", err);
            Err(error_response(&err))
        }
    }
}

// ============================================================================
// Health Routes
// ============================================================================

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
