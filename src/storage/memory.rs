//! In-process track catalog.
//!
//! Nothing survives a restart. Used by tests and when no database is wanted.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use super::{CatalogStats, StorageError, TrackCatalog};
use crate::mood::MoodLabel;
use crate::types::Track;

/// Helper trait to recover from poisoned RwLocks
trait RecoverableLock<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T>;
    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T>;
}

impl<T> RecoverableLock<T> for RwLock<T> {
    fn read_or_recover(&self) -> RwLockReadGuard<'_, T> {
        self.read().unwrap_or_else(|poisoned| {
            warn!("RwLock was poisoned during read, recovering");
            poisoned.into_inner()
        })
    }

    fn write_or_recover(&self) -> RwLockWriteGuard<'_, T> {
        self.write().unwrap_or_else(|poisoned| {
            warn!("RwLock was poisoned during write, recovering");
            poisoned.into_inner()
        })
    }
}

/// Catalog held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    /// track id -> track
    tracks: RwLock<HashMap<String, Track>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog pre-seeded with `tracks` (duplicates skipped)
    pub fn with_tracks(tracks: impl IntoIterator<Item = Track>) -> Self {
        let catalog = Self::new();
        {
            let mut map = catalog.tracks.write_or_recover();
            for track in tracks {
                map.entry(track.id.clone()).or_insert(track);
            }
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.tracks.read_or_recover().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// NaN features have no stored representation (SQLite reads them as NULL)
fn has_missing_feature(track: &Track) -> bool {
    track.valence.is_nan() || track.energy.is_nan() || track.danceability.is_nan()
}

#[async_trait]
impl TrackCatalog for MemoryCatalog {
    async fn initialize(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn upsert(&self, tracks: &[Track]) -> Result<u64, StorageError> {
        // Reject the batch up front so nothing is half-applied
        if let Some(track) = tracks.iter().find(|t| has_missing_feature(t)) {
            return Err(StorageError::OperationFailed(format!(
                "Track {} has a missing audio feature",
                track.id
            )));
        }

        let mut map = self.tracks.write_or_recover();
        let mut inserted = 0u64;
        for track in tracks {
            if map.contains_key(&track.id) {
                debug!(track_id = %track.id, "Duplicate track skipped");
                continue;
            }
            map.insert(track.id.clone(), track.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn sample_by_mood(&self, mood: MoodLabel) -> Result<Option<Track>, StorageError> {
        let map = self.tracks.read_or_recover();
        let matches: Vec<&Track> = map.values().filter(|t| t.mood == mood).collect();
        Ok(matches.choose(&mut rand::thread_rng()).map(|t| (*t).clone()))
    }

    async fn get(&self, id: &str) -> Result<Option<Track>, StorageError> {
        Ok(self.tracks.read_or_recover().get(id).cloned())
    }

    async fn stats(&self) -> Result<CatalogStats, StorageError> {
        let map = self.tracks.read_or_recover();
        Ok(CatalogStats::from_counts(map.values().map(|t| (t.mood, 1))))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::track;

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let catalog = MemoryCatalog::new();
        let batch = vec![track("a", 0.9, 0.9), track("b", 0.1, 0.1)];

        assert_eq!(catalog.upsert(&batch).await.unwrap(), 2);
        assert_eq!(catalog.upsert(&batch).await.unwrap(), 0);
        assert_eq!(catalog.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_within_one_batch() {
        let catalog = MemoryCatalog::new();
        let batch = vec![track("a", 0.9, 0.9), track("a", 0.1, 0.1)];

        assert_eq!(catalog.upsert(&batch).await.unwrap(), 1);
        let stored = catalog.get("a").await.unwrap().unwrap();
        assert_eq!(stored.mood, MoodLabel::Joy);
    }

    #[tokio::test]
    async fn test_batch_with_missing_feature_is_rejected_whole() {
        let catalog = MemoryCatalog::new();
        let batch = vec![track("ok", 0.5, 0.5), track("broken", f64::NAN, 0.5)];

        let result = catalog.upsert(&batch).await;
        assert!(matches!(result, Err(StorageError::OperationFailed(_))));
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_sample_by_mood() {
        let catalog = MemoryCatalog::with_tracks([track("love", 0.5, 0.5), track("joy", 0.9, 0.9)]);

        assert!(catalog.sample_by_mood(MoodLabel::Angry).await.unwrap().is_none());
        for _ in 0..10 {
            let picked = catalog.sample_by_mood(MoodLabel::Love).await.unwrap().unwrap();
            assert_eq!(picked.id, "love");
        }
    }

    #[tokio::test]
    async fn test_sample_is_roughly_uniform() {
        let catalog = MemoryCatalog::with_tracks([
            track("a", 0.1, 0.1),
            track("b", 0.2, 0.2),
            track("c", 0.3, 0.3),
            track("d", 0.35, 0.05),
        ]);

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..4000 {
            let picked = catalog.sample_by_mood(MoodLabel::Sad).await.unwrap().unwrap();
            *counts.entry(picked.id).or_default() += 1;
        }

        assert_eq!(counts.len(), 4);
        for (id, n) in counts {
            assert!((700..=1300).contains(&n), "track {id} picked {n} times");
        }
    }

    #[tokio::test]
    async fn test_stats() {
        let catalog = MemoryCatalog::with_tracks([track("a", 0.9, 0.9), track("b", 0.5, 0.5)]);
        let stats = catalog.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.count_for(MoodLabel::Joy), 1);
        assert_eq!(stats.count_for(MoodLabel::Love), 1);
        assert_eq!(catalog.backend(), "memory");
    }
}
