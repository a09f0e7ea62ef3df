//! Track catalog storage.
//!
//! This module provides a storage abstraction for the mood-tagged track
//! catalog, with implementations for:
//! - SQLite (persistent, pooled connections)
//! - in-process memory (tests and throwaway runs)

mod memory;
mod sqlite;

pub use memory::MemoryCatalog;
pub use sqlite::SqliteCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::mood::MoodLabel;
use crate::types::Track;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Storage operation failed: {0}")]
    OperationFailed(String),

    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::ConnectionFailed(err.to_string())
            }
            other => StorageError::OperationFailed(other.to_string()),
        }
    }
}

/// Number of stored tracks carrying one mood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodCount {
    pub mood: MoodLabel,
    pub count: u64,
}

/// Catalog size summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total: u64,
    /// One entry per label in `MoodLabel::ALL` order, zeros included
    pub by_mood: Vec<MoodCount>,
}

impl CatalogStats {
    /// Build stats from sparse per-mood counts
    pub fn from_counts(counts: impl IntoIterator<Item = (MoodLabel, u64)>) -> Self {
        let counts: Vec<(MoodLabel, u64)> = counts.into_iter().collect();
        let by_mood: Vec<MoodCount> = MoodLabel::ALL
            .iter()
            .map(|&mood| MoodCount {
                mood,
                count: counts
                    .iter()
                    .filter(|(m, _)| *m == mood)
                    .map(|(_, c)| c)
                    .sum(),
            })
            .collect();
        let total = by_mood.iter().map(|c| c.count).sum();
        Self { total, by_mood }
    }

    /// Count for a single mood
    pub fn count_for(&self, mood: MoodLabel) -> u64 {
        self.by_mood
            .iter()
            .find(|c| c.mood == mood)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}

/// Trait for track catalog backends
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    /// Create tables/indices if needed
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Insert every track whose id is not yet stored.
    ///
    /// Existing ids are skipped without error and without overwriting.
    /// Returns the number of newly inserted tracks. A batch is applied
    /// all-or-nothing.
    async fn upsert(&self, tracks: &[Track]) -> Result<u64, StorageError>;

    /// Pick one track with the given mood, uniformly at random.
    ///
    /// `Ok(None)` when no stored track carries that mood.
    async fn sample_by_mood(&self, mood: MoodLabel) -> Result<Option<Track>, StorageError>;

    /// Get a track by id
    async fn get(&self, id: &str) -> Result<Option<Track>, StorageError>;

    /// Total and per-mood counts
    async fn stats(&self) -> Result<CatalogStats, StorageError>;

    /// Backend name for diagnostics
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::types::{AudioFeatures, Track, TrackListing};

    /// Build a track whose features derive the requested mood bucket
    pub fn track(id: &str, valence: f64, energy: f64) -> Track {
        Track::from_listing(
            TrackListing {
                id: id.to_string(),
                name: format!("Song {id}"),
                artist: format!("Artist {id}"),
                playlist_id: "playlist".to_string(),
                track_url: format!("https://open.spotify.com/track/{id}"),
                playlist_url: "https://open.spotify.com/playlist/playlist".to_string(),
            },
            AudioFeatures {
                valence,
                energy,
                danceability: 0.5,
            },
        )
    }
}
