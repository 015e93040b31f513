//! Weather Insights Backend
//!
//! Ingests weather observations from collectors, serves paginated queries
//! and CSV exports, and derives insights reports with an optional
//! Gemini-generated narrative.

use std::sync::Arc;

use axum::{routing::get, Router};
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;

use crate::error::AppResult;
use crate::external::{GeminiClient, TextGenerator};
use crate::services::insights::DEFAULT_WINDOW_SIZE;
use crate::services::{InsightsService, NarrativeGenerator, ObservationService};

const DEFAULT_LOG_FILTER: &str = "weather_insights_backend=debug,tower_http=debug,sqlx=warn";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub observations: ObservationService,
    pub insights: InsightsService,
}

impl AppState {
    /// Build state from configuration, enabling Gemini when a key is set
    pub fn new(db: PgPool, config: Config) -> AppResult<Self> {
        let generator: Option<Arc<dyn TextGenerator>> = match config.gemini.api_key() {
            Some(key) => Some(Arc::new(GeminiClient::new(&config.gemini, key.to_string())?)),
            None => {
                tracing::info!("No Gemini API key configured, narratives use the local fallback");
                None
            }
        };

        Ok(Self::with_generator(db, config, generator))
    }

    /// Build state with an explicit text generator
    pub fn with_generator(db: PgPool, config: Config, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        let observations = ObservationService::new(db.clone());
        let window_size = match config.insights.window_size {
            0 => DEFAULT_WINDOW_SIZE,
            n => n,
        };
        let insights = InsightsService::new(
            Arc::new(observations.clone()),
            NarrativeGenerator::from_config(generator, &config.gemini),
            window_size,
        );

        Self {
            db,
            config: Arc::new(config),
            observations,
            insights,
        }
    }

    /// Replace the insights service, e.g. to read from another source
    pub fn with_insights(mut self, insights: InsightsService) -> Self {
        self.insights = insights;
        self
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Install the global tracing subscriber
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Root endpoint
async fn root() -> &'static str {
    "Weather Insights API v1"
}
