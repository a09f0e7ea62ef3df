use async_trait::async_trait;

use super::CatalogError;
use crate::types::{AudioFeatures, TrackListing};

/// A remote catalog of playlists and per-track audio analysis
#[async_trait]
pub trait MusicSource: Send + Sync {
    /// Ids of the currently featured playlists
    async fn featured_playlist_ids(&self) -> Result<Vec<String>, CatalogError>;

    /// Tracks listed in one playlist
    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<TrackListing>, CatalogError>;

    /// Audio features for each id, in request order.
    ///
    /// Tracks the service has no analysis for come back as `None`.
    async fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, CatalogError>;

    /// Short name for logs
    fn name(&self) -> &str;
}
