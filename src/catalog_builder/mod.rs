//! Offline catalog population.
//!
//! Walks the music API's featured playlists, fetches audio features for the
//! tracks found there, tags each with a derived mood and upserts the results
//! into a [`TrackCatalog`](crate::storage::TrackCatalog). Re-running is always
//! safe because upserts skip known ids.

mod pipeline;
mod source;
mod spotify;

pub use pipeline::{BuildReport, BuilderOptions, CatalogBuilder};
pub use source::MusicSource;
pub use spotify::SpotifyClient;

use crate::storage::StorageError;

/// Errors raised while building the catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Missing API credentials")]
    MissingCredentials,

    #[error("Unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Pipeline task failed: {0}")]
    Task(String),
}
