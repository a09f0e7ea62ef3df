//! HTTP server setup and routing.

mod extractors;
mod recommend;
mod routes;
mod tracks;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::inference::MoodClassifier;
use crate::recommend::Recommender;
use crate::storage::TrackCatalog;

pub use extractors::{MsgPackExtractor, MsgPackRejection};
pub use routes::MsgPack;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub recommender: Recommender,
    /// Server start time for uptime calculation
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        classifier: Arc<MoodClassifier>,
        catalog: Arc<dyn TrackCatalog>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            recommender: Recommender::new(classifier, catalog),
            started_at: Instant::now(),
        }
    }

    pub fn classifier(&self) -> &Arc<MoodClassifier> {
        self.recommender.classifier()
    }

    pub fn catalog(&self) -> &Arc<dyn TrackCatalog> {
        self.recommender.catalog()
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Creates the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(routes::health))
        .route("/config", get(routes::config))
        .route("/greeting", get(routes::greeting))
        // Recommendation endpoints
        .route("/recommend", post(recommend::recommend_text))
        .route("/recommend/mood", post(recommend::recommend_mood))
        // Mood classification endpoints
        .route("/mood/classify", post(recommend::classify_mood))
        .route("/mood/list", get(recommend::list_moods))
        // Catalog endpoints
        .route("/tracks/upsert", post(tracks::upsert))
        .route("/tracks/:id", get(tracks::get_track))
        .route("/catalog/stats", get(tracks::catalog_stats));

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
