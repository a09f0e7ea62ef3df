//! API request and response types for recommendation and track operations.

use serde::{Deserialize, Serialize};

use crate::mood::MoodLabel;
use crate::recommend::{RecommendationResult, TrackPick};
use crate::types::{AudioFeatures, InvalidFeatures, Track, TrackListing};

/// Free-text recommendation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendTextRequest {
    /// Chat message to classify
    pub text: String,
}

/// Explicit mood recommendation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendMoodRequest {
    /// Mood word; omitted means the command had no argument
    #[serde(default)]
    pub mood: Option<String>,
}

/// Recommendation response.
///
/// Always returned with status 200; `outcome` tells hits from misses,
/// guidance and apologies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    /// One of `found`, `not_found`, `invalid_mood`, `unavailable`
    pub outcome: String,
    #[serde(default)]
    pub mood: Option<MoodLabel>,
    #[serde(default)]
    pub track: Option<TrackPick>,
    /// Rendered chat text
    pub message: String,
}

impl From<RecommendationResult> for RecommendResponse {
    fn from(result: RecommendationResult) -> Self {
        let outcome = match &result {
            RecommendationResult::Found { .. } => "found",
            RecommendationResult::NotFound { .. } => "not_found",
            RecommendationResult::InvalidMood { .. } => "invalid_mood",
            RecommendationResult::Unavailable { .. } => "unavailable",
        };
        Self {
            outcome: outcome.to_string(),
            mood: result.mood(),
            track: result.track().cloned(),
            message: result.render(),
        }
    }
}

/// One track to add; the mood is derived from its features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackInput {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub playlist_id: String,
    pub track_url: String,
    pub playlist_url: String,
    pub valence: f64,
    pub energy: f64,
    pub danceability: f64,
}

impl TrackInput {
    /// Validate the features and build the catalog record
    pub fn into_track(self) -> Result<Track, InvalidFeatures> {
        let features = AudioFeatures {
            valence: self.valence,
            energy: self.energy,
            danceability: self.danceability,
        };
        features.validate()?;
        Ok(Track::from_listing(
            TrackListing {
                id: self.id,
                name: self.name,
                artist: self.artist,
                playlist_id: self.playlist_id,
                track_url: self.track_url,
                playlist_url: self.playlist_url,
            },
            features,
        ))
    }
}

/// Request to insert tracks into the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertTracksRequest {
    pub tracks: Vec<TrackInput>,
}

/// Response from upsert operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertTracksResponse {
    /// Tracks newly added
    pub inserted: u64,
    /// Tracks whose id was already stored
    pub skipped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::MoodSource;

    #[test]
    fn test_mood_request_defaults_to_missing() {
        let req: RecommendMoodRequest = serde_json::from_str("{}").unwrap();
        assert!(req.mood.is_none());

        let req: RecommendMoodRequest = serde_json::from_str(r#"{"mood": "sad"}"#).unwrap();
        assert_eq!(req.mood.as_deref(), Some("sad"));
    }

    #[test]
    fn test_response_from_found() {
        let result = RecommendationResult::Found {
            mood: MoodLabel::Sad,
            source: MoodSource::Classified,
            track: TrackPick {
                id: "t1".to_string(),
                name: "Hurt".to_string(),
                artist: "Johnny Cash".to_string(),
                track_url: "https://open.spotify.com/track/t1".to_string(),
                playlist_url: "https://open.spotify.com/playlist/p1".to_string(),
            },
            phrase: "You seem a little sad :cry:".to_string(),
        };

        let resp = RecommendResponse::from(result);
        assert_eq!(resp.outcome, "found");
        assert_eq!(resp.mood, Some(MoodLabel::Sad));
        assert_eq!(resp.track.as_ref().unwrap().name, "Hurt");
        assert!(resp.message.contains("**Hurt by Johnny Cash**"));
    }

    #[test]
    fn test_track_input_derives_mood() {
        let input = TrackInput {
            id: "t1".to_string(),
            name: "Song".to_string(),
            artist: "Artist".to_string(),
            playlist_id: "p1".to_string(),
            track_url: "https://open.spotify.com/track/t1".to_string(),
            playlist_url: "https://open.spotify.com/playlist/p1".to_string(),
            valence: 0.3,
            energy: 0.2,
            danceability: 0.4,
        };
        assert_eq!(input.clone().into_track().unwrap().mood, MoodLabel::Sad);

        let bad = TrackInput {
            energy: -0.1,
            ..input
        };
        assert_eq!(bad.into_track().unwrap_err().name, "energy");
    }

    #[test]
    fn test_response_from_guidance() {
        let result = RecommendationResult::InvalidMood {
            given: Some("purple".to_string()),
            valid: vec!["sad".to_string(), "joy".to_string()],
        };

        let resp = RecommendResponse::from(result);
        assert_eq!(resp.outcome, "invalid_mood");
        assert!(resp.mood.is_none());
        assert!(resp.track.is_none());
        assert!(resp.message.ends_with("You can choose from: sad, joy"));
    }
}
