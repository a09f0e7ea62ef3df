//! Recommendation and mood classification route handlers.

use axum::extract::State;
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;
use crate::inference::InferenceError;
use crate::types::{
    ListMoodsResponse, MoodClassifyRequest, MoodClassifyResponse, RecommendMoodRequest,
    RecommendResponse, RecommendTextRequest,
};

use super::extractors::MsgPackExtractor;
use super::routes::MsgPack;
use super::AppState;

/// POST /api/v1/recommend
///
/// Classify a chat message and recommend a track for its mood.
pub async fn recommend_text(
    State(state): State<AppState>,
    MsgPackExtractor(req): MsgPackExtractor<RecommendTextRequest>,
) -> MsgPack<RecommendResponse> {
    debug!(text_len = req.text.len(), "Free-text recommendation");
    let result = state.recommender.recommend(&req.text, false).await;
    MsgPack(result.into())
}

/// POST /api/v1/recommend/mood
///
/// Recommend a track for an explicitly named mood.
pub async fn recommend_mood(
    State(state): State<AppState>,
    MsgPackExtractor(req): MsgPackExtractor<RecommendMoodRequest>,
) -> MsgPack<RecommendResponse> {
    let result = state
        .recommender
        .recommend_for_command(req.mood.as_deref())
        .await;
    MsgPack(result.into())
}

/// POST /api/v1/mood/classify
///
/// Classify a message without touching the catalog.
pub async fn classify_mood(
    State(state): State<AppState>,
    MsgPackExtractor(req): MsgPackExtractor<MoodClassifyRequest>,
) -> Result<MsgPack<MoodClassifyResponse>, AppError> {
    let classifier = Arc::clone(state.classifier());
    let prediction = tokio::task::spawn_blocking(move || classifier.predict(&req.text))
        .await
        .map_err(|e| InferenceError::Task(e.to_string()))??;

    Ok(MsgPack(prediction.into()))
}

/// GET /api/v1/mood/list
///
/// List mood labels, their phrases and the accepted command words.
pub async fn list_moods(State(_state): State<AppState>) -> MsgPack<ListMoodsResponse> {
    MsgPack(ListMoodsResponse::current())
}
