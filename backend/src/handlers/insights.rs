//! HTTP handlers for weather insights

use axum::{extract::State, Json};
use shared::{InsightsOutcome, RefreshedInsights};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

/// Insights over the recent observation window
pub async fn get_insights(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<InsightsOutcome>> {
    let outcome = state.insights.compute_insights().await?;
    Ok(Json(outcome))
}

/// Recompute insights on demand
pub async fn refresh_insights(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<RefreshedInsights>> {
    let refreshed = state.insights.refresh_insights().await?;
    Ok(Json(refreshed))
}
