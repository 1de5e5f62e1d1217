//! Health and maintenance handlers.

use crate::error::ApiResult;
use crate::images::OrphanSweep;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health - Health check.
///
/// Returns only the status and version; fails when the room store is unreachable.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.metadata.health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// Orphan report.
#[derive(Debug, Serialize)]
pub struct OrphansResponse {
    pub success: bool,
    pub count: usize,
    pub orphans: Vec<String>,
}

/// Orphan sweep report.
#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub success: bool,
    #[serde(flatten)]
    pub sweep: OrphanSweep,
}

/// GET /admin/orphans - List permanent images no room references.
pub async fn list_orphans(State(state): State<AppState>) -> ApiResult<Json<OrphansResponse>> {
    let orphans = state.images.find_orphans().await?;
    Ok(Json(OrphansResponse {
        success: true,
        count: orphans.len(),
        orphans,
    }))
}

/// DELETE /admin/orphans - Delete permanent images no room references.
pub async fn sweep_orphans(State(state): State<AppState>) -> ApiResult<Json<SweepResponse>> {
    let sweep = state.images.sweep_orphans().await?;
    Ok(Json(SweepResponse {
        success: sweep.failed.is_empty(),
        sweep,
    }))
}
