//! Funnel statistics and retention (admin only)

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::tracking::{PurgeResult, TrackingStats, TrackingStatsQuery},
};

use super::AuthenticatedUser;

#[derive(Debug, Default, Deserialize)]
pub struct PurgeRequest {
    /// Defaults to the configured retention
    pub retention_days: Option<i64>,
}

pub async fn get_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<TrackingStatsQuery>,
) -> AppResult<Json<TrackingStats>> {
    claims.require_admin()?;
    Ok(Json(state.services.tracking.stats(query.days).await?))
}

pub async fn purge(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<PurgeRequest>,
) -> AppResult<Json<PurgeResult>> {
    claims.require_admin()?;
    Ok(Json(state.services.tracking.purge(request.retention_days).await?))
}
