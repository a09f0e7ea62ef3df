//! Track catalog route handlers.

use axum::extract::{Path, State};
use tracing::{debug, info};

use crate::error::AppError;
use crate::storage::CatalogStats;
use crate::types::{Track, UpsertTracksRequest, UpsertTracksResponse};

use super::extractors::MsgPackExtractor;
use super::routes::MsgPack;
use super::AppState;

/// POST /api/v1/tracks/upsert
///
/// Insert tracks whose ids are not yet stored. The whole request is
/// rejected if any track carries out-of-range features.
pub async fn upsert(
    State(state): State<AppState>,
    MsgPackExtractor(req): MsgPackExtractor<UpsertTracksRequest>,
) -> Result<MsgPack<UpsertTracksResponse>, AppError> {
    let tracks = req
        .tracks
        .into_iter()
        .map(|input| {
            let id = input.id.clone();
            input
                .into_track()
                .map_err(|e| AppError::BadRequest(format!("Track '{id}': {e}")))
        })
        .collect::<Result<Vec<Track>, AppError>>()?;

    let inserted = state.catalog().upsert(&tracks).await?;
    let skipped = tracks.len() as u64 - inserted;
    info!(inserted, skipped, "Upserted tracks");

    Ok(MsgPack(UpsertTracksResponse { inserted, skipped }))
}

/// GET /api/v1/tracks/:id
pub async fn get_track(
    State(state): State<AppState>,
    Path(track_id): Path<String>,
) -> Result<MsgPack<Track>, AppError> {
    debug!(track_id = %track_id, "Getting track");

    state
        .catalog()
        .get(&track_id)
        .await?
        .map(MsgPack)
        .ok_or_else(|| AppError::NotFound(format!("Track '{}' not found", track_id)))
}

/// GET /api/v1/catalog/stats
pub async fn catalog_stats(State(state): State<AppState>) -> Result<MsgPack<CatalogStats>, AppError> {
    Ok(MsgPack(state.catalog().stats().await?))
}
