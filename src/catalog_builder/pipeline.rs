//! Producer/consumer catalog build.
//!
//! The producer walks the candidate tracks in feature-sized chunks, fetches
//! audio features and turns each chunk into a batch of mood-tagged tracks.
//! The consumer upserts batches as they arrive. A failed chunk or a failed
//! upsert only loses that batch.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{CatalogError, MusicSource};
use crate::config::CatalogConfig;
use crate::storage::TrackCatalog;
use crate::types::{Track, TrackListing};

/// Pacing and batching knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderOptions {
    /// Track ids per feature request
    pub batch_size: usize,
    /// Pause between feature requests
    pub batch_delay: Duration,
    /// Pause after listing playlists and after listing their tracks
    pub listing_delay: Duration,
}

impl From<&CatalogConfig> for BuilderOptions {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            batch_size: config.effective_batch_size(),
            batch_delay: config.batch_delay(),
            listing_delay: config.listing_delay(),
        }
    }
}

/// Counters for one build run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub playlists: usize,
    pub playlists_failed: usize,
    /// Distinct tracks found across all playlists
    pub candidates: usize,
    pub skipped_without_features: usize,
    pub skipped_invalid: usize,
    pub batches_stored: usize,
    /// Chunks lost to a feature request or upsert failure
    pub batches_failed: usize,
    pub inserted: u64,
    /// Tracks already present in the catalog
    pub duplicates: u64,
}

#[derive(Debug, Default)]
struct ProducerStats {
    skipped_without_features: usize,
    skipped_invalid: usize,
    fetch_failures: usize,
}

/// Populates a catalog from a music source
pub struct CatalogBuilder {
    source: Arc<dyn MusicSource>,
    catalog: Arc<dyn TrackCatalog>,
    options: BuilderOptions,
}

impl CatalogBuilder {
    pub fn new(
        source: Arc<dyn MusicSource>,
        catalog: Arc<dyn TrackCatalog>,
        options: BuilderOptions,
    ) -> Self {
        Self {
            source,
            catalog,
            options,
        }
    }

    /// Run one full build.
    ///
    /// Only a failure to list the featured playlists aborts the run. Every
    /// later failure is counted in the report and skipped.
    pub async fn run(&self) -> Result<BuildReport, CatalogError> {
        let mut report = BuildReport::default();

        let playlist_ids = self.source.featured_playlist_ids().await?;
        report.playlists = playlist_ids.len();
        info!(source = self.source.name(), playlists = playlist_ids.len(), "Fetched featured playlists");
        tokio::time::sleep(self.options.listing_delay).await;

        let candidates = self.collect_candidates(&playlist_ids, &mut report).await;
        report.candidates = candidates.len();
        info!(candidates = candidates.len(), "Collected candidate tracks");
        tokio::time::sleep(self.options.listing_delay).await;

        let (tx, mut rx) = mpsc::channel::<Vec<Track>>(4);
        let producer = tokio::spawn(produce_batches(
            Arc::clone(&self.source),
            candidates,
            self.options,
            tx,
        ));

        while let Some(batch) = rx.recv().await {
            match self.catalog.upsert(&batch).await {
                Ok(inserted) => {
                    report.batches_stored += 1;
                    report.inserted += inserted;
                    report.duplicates += batch.len() as u64 - inserted;
                    info!(
                        batch_len = batch.len(),
                        inserted,
                        duplicates = batch.len() as u64 - inserted,
                        "Stored batch"
                    );
                }
                Err(e) => {
                    report.batches_failed += 1;
                    warn!(batch_len = batch.len(), error = %e, "Failed to store batch, skipping");
                }
            }
        }

        let stats = producer
            .await
            .map_err(|e| CatalogError::Task(e.to_string()))?;
        report.skipped_without_features = stats.skipped_without_features;
        report.skipped_invalid = stats.skipped_invalid;
        report.batches_failed += stats.fetch_failures;

        info!(
            inserted = report.inserted,
            duplicates = report.duplicates,
            batches_failed = report.batches_failed,
            "Catalog build finished"
        );
        Ok(report)
    }

    /// List every playlist's tracks, keeping the first listing of each id
    async fn collect_candidates(
        &self,
        playlist_ids: &[String],
        report: &mut BuildReport,
    ) -> Vec<TrackListing> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for playlist_id in playlist_ids {
            match self.source.playlist_tracks(playlist_id).await {
                Ok(listings) => {
                    debug!(playlist_id = %playlist_id, tracks = listings.len(), "Listed playlist");
                    for listing in listings {
                        if seen.insert(listing.id.clone()) {
                            candidates.push(listing);
                        }
                    }
                }
                Err(e) => {
                    report.playlists_failed += 1;
                    warn!(playlist_id = %playlist_id, error = %e, "Failed to list playlist, skipping");
                }
            }
        }

        candidates
    }
}

async fn produce_batches(
    source: Arc<dyn MusicSource>,
    candidates: Vec<TrackListing>,
    options: BuilderOptions,
    tx: mpsc::Sender<Vec<Track>>,
) -> ProducerStats {
    let mut stats = ProducerStats::default();
    let batch_size = options.batch_size.max(1);

    for (index, chunk) in candidates.chunks(batch_size).enumerate() {
        if index > 0 {
            tokio::time::sleep(options.batch_delay).await;
        }

        let ids: Vec<String> = chunk.iter().map(|l| l.id.clone()).collect();
        let features = match source.audio_features(&ids).await {
            Ok(features) => features,
            Err(e) => {
                stats.fetch_failures += 1;
                warn!(chunk = index, error = %e, "Failed to fetch audio features, skipping chunk");
                continue;
            }
        };

        if features.len() != chunk.len() {
            warn!(
                chunk = index,
                requested = chunk.len(),
                received = features.len(),
                "Feature count mismatch"
            );
        }

        let mut batch = Vec::with_capacity(chunk.len());
        for (listing, features) in chunk.iter().zip(features) {
            let Some(features) = features else {
                stats.skipped_without_features += 1;
                continue;
            };
            if let Err(e) = features.validate() {
                stats.skipped_invalid += 1;
                warn!(track_id = %listing.id, error = %e, "Skipping track with invalid features");
                continue;
            }
            batch.push(Track::from_listing(listing.clone(), features));
        }

        if batch.is_empty() {
            continue;
        }
        if tx.send(batch).await.is_err() {
            warn!("Batch consumer went away, stopping");
            break;
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::MoodLabel;
    use crate::storage::MemoryCatalog;
    use crate::types::AudioFeatures;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        playlists: Vec<(String, Vec<TrackListing>)>,
        features: HashMap<String, AudioFeatures>,
        failing_playlists: HashSet<String>,
        /// Feature requests containing this id fail
        poison_id: Option<String>,
        requests: Mutex<Vec<usize>>,
    }

    fn listing(id: &str, playlist: &str) -> TrackListing {
        TrackListing {
            id: id.to_string(),
            name: format!("Song {id}"),
            artist: "Artist".to_string(),
            playlist_id: playlist.to_string(),
            track_url: format!("https://open.spotify.com/track/{id}"),
            playlist_url: format!("https://open.spotify.com/playlist/{playlist}"),
        }
    }

    fn features(valence: f64, energy: f64) -> AudioFeatures {
        AudioFeatures {
            valence,
            energy,
            danceability: 0.5,
        }
    }

    #[async_trait]
    impl MusicSource for FakeSource {
        async fn featured_playlist_ids(&self) -> Result<Vec<String>, CatalogError> {
            Ok(self.playlists.iter().map(|(id, _)| id.clone()).collect())
        }

        async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackListing>, CatalogError> {
            if self.failing_playlists.contains(playlist_id) {
                return Err(CatalogError::Status {
                    endpoint: "playlist-tracks".to_string(),
                    status: 500,
                });
            }
            Ok(self
                .playlists
                .iter()
                .find(|(id, _)| id == playlist_id)
                .map(|(_, tracks)| tracks.clone())
                .unwrap_or_default())
        }

        async fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, CatalogError> {
            self.requests.lock().unwrap().push(ids.len());
            if let Some(poison) = &self.poison_id {
                if ids.contains(poison) {
                    return Err(CatalogError::Status {
                        endpoint: "audio-features".to_string(),
                        status: 429,
                    });
                }
            }
            Ok(ids.iter().map(|id| self.features.get(id).copied()).collect())
        }

        fn name(&self) -> &str {
            "fake"
        }
    }

    fn options(batch_size: usize) -> BuilderOptions {
        BuilderOptions {
            batch_size,
            batch_delay: Duration::ZERO,
            listing_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_build_dedups_and_skips_missing_features() {
        let source = FakeSource {
            playlists: vec![
                ("p1".to_string(), vec![listing("a", "p1"), listing("b", "p1")]),
                ("p2".to_string(), vec![listing("a", "p2"), listing("c", "p2")]),
            ],
            features: HashMap::from([
                ("a".to_string(), features(0.9, 0.9)),
                ("b".to_string(), features(0.5, 0.5)),
            ]),
            ..Default::default()
        };
        let catalog = Arc::new(MemoryCatalog::new());
        let builder = CatalogBuilder::new(Arc::new(source), catalog.clone(), options(50));

        let report = builder.run().await.unwrap();
        assert_eq!(report.playlists, 2);
        assert_eq!(report.candidates, 3);
        assert_eq!(report.skipped_without_features, 1);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.batches_stored, 1);

        let a = catalog.get("a").await.unwrap().unwrap();
        assert_eq!(a.mood, MoodLabel::Joy);
        // first listing wins
        assert_eq!(a.playlist_id, "p1");
        assert_eq!(catalog.get("b").await.unwrap().unwrap().mood, MoodLabel::Love);
        assert!(catalog.get("c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_chunks_respect_batch_size() {
        let tracks: Vec<TrackListing> = (0..120).map(|i| listing(&format!("t{i}"), "p1")).collect();
        let features = tracks
            .iter()
            .map(|l| (l.id.clone(), features(0.1, 0.1)))
            .collect();
        let source = Arc::new(FakeSource {
            playlists: vec![("p1".to_string(), tracks)],
            features,
            ..Default::default()
        });
        let catalog = Arc::new(MemoryCatalog::new());
        let builder = CatalogBuilder::new(source.clone(), catalog.clone(), options(50));

        let report = builder.run().await.unwrap();
        assert_eq!(*source.requests.lock().unwrap(), vec![50, 50, 20]);
        assert_eq!(report.batches_stored, 3);
        assert_eq!(report.inserted, 120);
        assert_eq!(catalog.len(), 120);
    }

    #[tokio::test]
    async fn test_failed_chunk_and_playlist_are_skipped() {
        let tracks: Vec<TrackListing> = (0..6).map(|i| listing(&format!("t{i}"), "p1")).collect();
        let features = tracks
            .iter()
            .map(|l| (l.id.clone(), features(0.5, 0.5)))
            .collect();
        let source = FakeSource {
            playlists: vec![
                ("p1".to_string(), tracks),
                ("broken".to_string(), vec![listing("x", "broken")]),
            ],
            features,
            failing_playlists: HashSet::from(["broken".to_string()]),
            poison_id: Some("t3".to_string()),
            ..Default::default()
        };
        let catalog = Arc::new(MemoryCatalog::new());
        let builder = CatalogBuilder::new(Arc::new(source), catalog.clone(), options(2));

        let report = builder.run().await.unwrap();
        assert_eq!(report.playlists_failed, 1);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.batches_stored, 2);
        assert_eq!(report.inserted, 4);
        assert!(catalog.get("t2").await.unwrap().is_none());
        assert!(catalog.get("t4").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rerun_is_safe() {
        let source = Arc::new(FakeSource {
            playlists: vec![("p1".to_string(), vec![listing("a", "p1"), listing("b", "p1")])],
            features: HashMap::from([
                ("a".to_string(), features(0.2, 0.9)),
                ("b".to_string(), features(0.7, 0.2)),
            ]),
            ..Default::default()
        });
        let catalog = Arc::new(MemoryCatalog::new());
        let builder = CatalogBuilder::new(source, catalog.clone(), options(50));

        let first = builder.run().await.unwrap();
        let second = builder.run().await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("a").await.unwrap().unwrap().mood, MoodLabel::Angry);
        assert_eq!(catalog.get("b").await.unwrap().unwrap().mood, MoodLabel::Neutral);
    }

    #[tokio::test]
    async fn test_invalid_features_are_rejected() {
        let source = FakeSource {
            playlists: vec![("p1".to_string(), vec![listing("a", "p1"), listing("b", "p1")])],
            features: HashMap::from([
                ("a".to_string(), features(1.5, 0.9)),
                ("b".to_string(), features(0.3, 0.3)),
            ]),
            ..Default::default()
        };
        let catalog = Arc::new(MemoryCatalog::new());
        let builder = CatalogBuilder::new(Arc::new(source), catalog.clone(), options(50));

        let report = builder.run().await.unwrap();
        assert_eq!(report.skipped_invalid, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(catalog.get("b").await.unwrap().unwrap().mood, MoodLabel::Sad);
    }
}
