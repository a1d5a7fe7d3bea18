//! HTTP status API over the artifact cache.
//!
//! Provides endpoints for:
//! - The current artifact, in full or summarized
//! - Contours of one variable as GeoJSON
//! - Refresh status and manual refresh
//! - Health and Prometheus metrics

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use contour::ContourFeatureCollection;
use ingestion::RejectionTally;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use wx_common::{SourceId, Variable};

use crate::pipeline::{ArtifactStatus, MapArtifact};
use crate::scheduler::RefreshScheduler;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactSummary {
    pub generated_at: DateTime<Utc>,
    pub status: ArtifactStatus,
    pub station_count: usize,
    pub stations_per_source: BTreeMap<SourceId, usize>,
    pub duplicates_resolved: usize,
    pub rejections: RejectionTally,
    pub malformed_records: BTreeMap<SourceId, usize>,
    pub source_failures: BTreeSet<SourceId>,
    pub degraded_variables: BTreeSet<Variable>,
    pub variables: BTreeMap<Variable, VariableSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableSummary {
    pub unit: &'static str,
    pub stations: usize,
    pub grid: Option<GridSummary>,
    pub contour_levels: Vec<f64>,
    pub contour_lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridSummary {
    pub nx: usize,
    pub ny: usize,
    pub resolution_deg: f64,
    pub valid_nodes: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ArtifactSummary {
    pub fn from_artifact(artifact: &MapArtifact) -> Self {
        let variables = Variable::ALL
            .iter()
            .map(|&variable| {
                let grid = artifact.grid(variable).map(|g| {
                    let range = g.value_range();
                    GridSummary {
                        nx: g.nx,
                        ny: g.ny,
                        resolution_deg: g.resolution_deg,
                        valid_nodes: g.valid_count(),
                        min: range.map(|r| r.0),
                        max: range.map(|r| r.1),
                    }
                });
                let contours = artifact.contours(variable);
                let summary = VariableSummary {
                    unit: variable.unit(),
                    stations: artifact.dataset.count_with(variable),
                    grid,
                    contour_levels: contours.map(|c| c.level_values()).unwrap_or_default(),
                    contour_lines: contours.map(|c| c.line_count()).unwrap_or(0),
                };
                (variable, summary)
            })
            .collect();

        Self {
            generated_at: artifact.generated_at,
            status: artifact.status,
            station_count: artifact.dataset.len(),
            stations_per_source: artifact.dataset.per_source(),
            duplicates_resolved: artifact.dataset.duplicates_resolved,
            rejections: artifact.dataset.rejections,
            malformed_records: artifact.malformed_records.clone(),
            source_failures: artifact.source_failures.clone(),
            degraded_variables: artifact.degraded_variables.clone(),
            variables,
        }
    }
}

// ============================================================================
// Shared State
// ============================================================================

pub struct ServerState {
    pub scheduler: Arc<RefreshScheduler>,
    /// Absent when no Prometheus recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
}

// ============================================================================
// Router
// ============================================================================

/// Create the status API router.
pub fn create_router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/artifact", get(artifact_handler))
        .route("/artifact/summary", get(summary_handler))
        .route("/artifact/contours/:variable", get(contours_handler))
        .route("/status", get(status_handler))
        .route("/refresh", post(refresh_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(Extension(state))
}

/// Run the status API server.
pub async fn run_server(state: Arc<ServerState>, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    info!(port = port, "Starting status API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

fn not_available() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "status": "not_available" })),
    )
        .into_response()
}

/// GET /artifact - The full current artifact
async fn artifact_handler(Extension(state): Extension<Arc<ServerState>>) -> Response {
    match state.scheduler.current() {
        Some(artifact) => Json(artifact).into_response(),
        None => not_available(),
    }
}

/// GET /artifact/summary - Counts and ranges without grids
async fn summary_handler(Extension(state): Extension<Arc<ServerState>>) -> Response {
    match state.scheduler.current() {
        Some(artifact) => Json(ArtifactSummary::from_artifact(&artifact)).into_response(),
        None => not_available(),
    }
}

/// GET /artifact/contours/:variable - Isolines as a GeoJSON FeatureCollection
async fn contours_handler(
    Extension(state): Extension<Arc<ServerState>>,
    Path(variable): Path<String>,
) -> Response {
    let variable: Variable = match variable.parse() {
        Ok(v) => v,
        Err(e) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": e })),
            )
                .into_response();
        }
    };

    let Some(artifact) = state.scheduler.current() else {
        return not_available();
    };

    match artifact.contours(variable) {
        Some(contours) => {
            let collection = ContourFeatureCollection::from(contours);
            (
                [(header::CONTENT_TYPE, "application/geo+json")],
                Json(collection),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("{} is degraded in the current artifact", variable)
            })),
        )
            .into_response(),
    }
}

/// GET /status - Refresh state and last outcome
async fn status_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    Json(state.scheduler.status())
}

/// POST /refresh - Start a cycle unless one is running
async fn refresh_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    let ack = state.scheduler.request_manual_refresh();
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "result": ack })),
    )
}

/// GET /health - Liveness
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "refresher",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /metrics - Prometheus metrics endpoint
async fn metrics_handler(Extension(state): Extension<Arc<ServerState>>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
