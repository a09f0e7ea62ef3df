//! Mood Jukebox - offline catalog builder

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use mood_jukebox::catalog_builder::{BuilderOptions, CatalogBuilder, SpotifyClient};
use mood_jukebox::{config::AppConfig, init_logging, SqliteCatalog, TrackCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::load().context("Failed to load configuration")?;
    config
        .validate_for_builder()
        .context("Missing required configuration")?;

    let options = BuilderOptions::from(&config.catalog);
    info!(
        batch_size = options.batch_size,
        batch_delay_s = options.batch_delay.as_secs(),
        listing_delay_s = options.listing_delay.as_secs(),
        "Starting catalog build"
    );

    let database_url = config
        .database
        .url
        .as_deref()
        .context("database.url is not set")?;
    let catalog = SqliteCatalog::connect(database_url, config.database.max_connections)
        .await
        .context("Failed to open track catalog")?;
    let catalog: Arc<dyn TrackCatalog> = Arc::new(catalog);

    let source = SpotifyClient::from_config(&config.catalog).context("Failed to create API client")?;

    let builder = CatalogBuilder::new(Arc::new(source), Arc::clone(&catalog), options);
    let report = builder.run().await.context("Catalog build failed")?;

    let stats = catalog.stats().await.context("Failed to read catalog stats")?;
    info!(
        playlists = report.playlists,
        candidates = report.candidates,
        inserted = report.inserted,
        duplicates = report.duplicates,
        skipped_without_features = report.skipped_without_features,
        batches_failed = report.batches_failed,
        catalog_total = stats.total,
        "Catalog build complete"
    );

    Ok(())
}
