//! Route definitions for the Weather Insights API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .nest("/weather", weather_routes(state))
}

/// Weather routes; ingest is public, reads are protected
fn weather_routes(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logs", get(handlers::list_observations))
        .route("/logs/:observation_id", get(handlers::get_observation))
        .route("/export.csv", get(handlers::export_observations_csv))
        .route("/export.xlsx", get(handlers::export_observations_xlsx))
        .route("/insights", get(handlers::get_insights))
        .route(
            "/insights/refresh",
            get(handlers::refresh_insights).post(handlers::refresh_insights),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        // Collector ingest (internal network)
        .route("/logs", post(handlers::create_observation))
        .merge(protected)
}
