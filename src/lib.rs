//! Mood Jukebox
//!
//! Classifies the emotional tone of short chat messages and recommends a
//! track from a mood-tagged catalog. The catalog is filled offline from a
//! music API by the `catalog-builder` binary.

pub mod catalog_builder;
pub mod config;
pub mod error;
pub mod inference;
pub mod math;
pub mod mood;
pub mod recommend;
pub mod server;
pub mod storage;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use inference::{MoodClassifier, SequenceClassifier};
pub use mood::MoodLabel;
pub use recommend::{RecommendationResult, Recommender};
pub use storage::{MemoryCatalog, SqliteCatalog, TrackCatalog};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber for logging
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mood_jukebox=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
