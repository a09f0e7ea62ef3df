//! SQLite-backed track catalog.
//!
//! Every operation checks a connection out of the pool and hands it back when
//! the guard drops, so no connection outlives the call that used it, error
//! paths included. Upserts run inside one transaction per batch; an error
//! part-way through drops the transaction and rolls the batch back.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use super::{CatalogStats, StorageError, TrackCatalog};
use crate::mood::MoodLabel;
use crate::types::Track;

const CREATE_TRACKS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS tracks (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        artist TEXT NOT NULL,
        playlist_id TEXT NOT NULL,
        valence REAL NOT NULL,
        energy REAL NOT NULL,
        danceability REAL NOT NULL,
        mood TEXT NOT NULL CHECK (mood IN ('sad', 'joy', 'love', 'angry', 'neutral')),
        track_url TEXT NOT NULL,
        playlist_url TEXT NOT NULL
    )
"#;

const CREATE_MOOD_INDEX: &str = "CREATE INDEX IF NOT EXISTS idx_tracks_mood ON tracks (mood)";

const INSERT_TRACK: &str = r#"
    INSERT INTO tracks (
        id, name, artist, playlist_id, valence, energy, danceability,
        mood, track_url, playlist_url
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(id) DO NOTHING
"#;

const TRACK_COLUMNS: &str =
    "id, name, artist, playlist_id, valence, energy, danceability, mood, track_url, playlist_url";

/// Persistent catalog stored in a SQLite database
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog")
            .field("connections", &self.pool.size())
            .finish()
    }
}

impl SqliteCatalog {
    /// Open (creating if missing) the database at `url` and ensure the schema.
    ///
    /// `url` is a sqlx SQLite URL such as `sqlite://catalog.db` or
    /// `sqlite::memory:`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::ConnectionFailed(format!("Invalid database url: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        let catalog = Self { pool };
        catalog.initialize().await?;

        info!(url, max_connections, "SQLite catalog ready");
        Ok(catalog)
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn track_from_row(row: &SqliteRow) -> Result<Track, StorageError> {
    let id: String = row.try_get("id")?;
    let mood: String = row.try_get("mood")?;
    let mood = MoodLabel::from_str(&mood).map_err(|e| StorageError::CorruptRecord {
        id: id.clone(),
        reason: e.to_string(),
    })?;

    Ok(Track {
        id,
        name: row.try_get("name")?,
        artist: row.try_get("artist")?,
        playlist_id: row.try_get("playlist_id")?,
        valence: row.try_get("valence")?,
        energy: row.try_get("energy")?,
        danceability: row.try_get("danceability")?,
        mood,
        track_url: row.try_get("track_url")?,
        playlist_url: row.try_get("playlist_url")?,
    })
}

#[async_trait]
impl TrackCatalog for SqliteCatalog {
    async fn initialize(&self) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query(CREATE_TRACKS_TABLE).execute(&mut *conn).await?;
        sqlx::query(CREATE_MOOD_INDEX).execute(&mut *conn).await?;
        Ok(())
    }

    async fn upsert(&self, tracks: &[Track]) -> Result<u64, StorageError> {
        if tracks.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for track in tracks {
            let result = sqlx::query(INSERT_TRACK)
                .bind(&track.id)
                .bind(&track.name)
                .bind(&track.artist)
                .bind(&track.playlist_id)
                .bind(track.valence)
                .bind(track.energy)
                .bind(track.danceability)
                .bind(track.mood.as_str())
                .bind(&track.track_url)
                .bind(&track.playlist_url)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() > 0 {
                inserted += 1;
            } else {
                debug!(track_id = %track.id, "Duplicate track skipped");
            }
        }

        tx.commit().await?;

        debug!(
            batch = tracks.len(),
            inserted,
            skipped = tracks.len() as u64 - inserted,
            "Upserted track batch"
        );
        Ok(inserted)
    }

    async fn sample_by_mood(&self, mood: MoodLabel) -> Result<Option<Track>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!(
            "SELECT {TRACK_COLUMNS} FROM tracks WHERE mood = ? ORDER BY RANDOM() LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(mood.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(track_from_row).transpose()
    }

    async fn get(&self, id: &str) -> Result<Option<Track>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.as_ref().map(track_from_row).transpose()
    }

    async fn stats(&self) -> Result<CatalogStats, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query("SELECT mood, COUNT(*) AS n FROM tracks GROUP BY mood")
            .fetch_all(&mut *conn)
            .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let mood: String = row.try_get("mood")?;
            let n: i64 = row.try_get("n")?;
            let mood = MoodLabel::from_str(&mood).map_err(|e| StorageError::CorruptRecord {
                id: format!("mood={mood}"),
                reason: e.to_string(),
            })?;
            counts.push((mood, n.max(0) as u64));
        }

        Ok(CatalogStats::from_counts(counts))
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
