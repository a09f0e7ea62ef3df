//! Recommendation orchestration.
//!
//! Turns either a free-text message or an explicit mood command into one
//! track pick. Every failure below this layer is folded into a well-formed
//! [`RecommendationResult`]; callers never see an error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::inference::{InferenceError, MoodClassifier};
use crate::mood::{command_vocabulary, phrase_for, MoodLabel};
use crate::storage::TrackCatalog;
use crate::types::Track;

/// Shown when nothing in the catalog carries the requested mood
pub const NOT_FOUND_MESSAGE: &str = "I couldn't find any songs that fit your mood, sorry.";

/// Shown when classification or lookup fails
pub const UNAVAILABLE_MESSAGE: &str =
    "Sorry, I can't recommend a song right now. Please try again later.";

/// How the mood was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodSource {
    /// Inferred from a free-text message
    Classified,
    /// Named by the user in a mood command
    Requested,
}

/// The track fields shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPick {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub track_url: String,
    pub playlist_url: String,
}

impl From<Track> for TrackPick {
    fn from(track: Track) -> Self {
        Self {
            id: track.id,
            name: track.name,
            artist: track.artist,
            track_url: track.track_url,
            playlist_url: track.playlist_url,
        }
    }
}

/// Outcome of a single recommendation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecommendationResult {
    /// A track matching the mood was picked
    Found {
        mood: MoodLabel,
        source: MoodSource,
        track: TrackPick,
        /// Mood phrase with its emoji marker
        phrase: String,
    },
    /// The catalog holds no track with this mood
    NotFound { mood: MoodLabel },
    /// The mood command was missing its argument or named an unknown mood
    InvalidMood {
        given: Option<String>,
        valid: Vec<String>,
    },
    /// Classification or the catalog failed
    Unavailable { reason: String },
}

impl RecommendationResult {
    fn invalid(given: Option<&str>) -> Self {
        Self::InvalidMood {
            given: given.map(str::to_string),
            valid: command_vocabulary().into_iter().map(str::to_string).collect(),
        }
    }

    pub fn mood(&self) -> Option<MoodLabel> {
        match self {
            Self::Found { mood, .. } | Self::NotFound { mood } => Some(*mood),
            _ => None,
        }
    }

    pub fn track(&self) -> Option<&TrackPick> {
        match self {
            Self::Found { track, .. } => Some(track),
            _ => None,
        }
    }

    /// Chat text for this result
    pub fn render(&self) -> String {
        match self {
            Self::Found {
                source: MoodSource::Classified,
                track,
                phrase,
                ..
            } => format!(
                "{phrase} \n\nHere's a song that could fit your mood:\n**{} by {}** \n{} \n\nFrom this playlist: \n{}",
                track.name, track.artist, track.track_url, track.playlist_url
            ),
            Self::Found {
                source: MoodSource::Requested,
                track,
                ..
            } => format!(
                "Here's a song for you based on your mood: \n**{} by {}** \n{}",
                track.name, track.artist, track.track_url
            ),
            Self::NotFound { .. } => NOT_FOUND_MESSAGE.to_string(),
            Self::InvalidMood { valid, .. } => format!(
                "Please provide a mood to base your recommendation on. You can choose from: {}",
                valid.join(", ")
            ),
            Self::Unavailable { .. } => UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}

/// Classify-then-lookup pipeline
#[derive(Clone)]
pub struct Recommender {
    classifier: Arc<MoodClassifier>,
    catalog: Arc<dyn TrackCatalog>,
}

impl std::fmt::Debug for Recommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recommender")
            .field("classifier", &self.classifier)
            .field("catalog", &self.catalog.backend())
            .finish()
    }
}

impl Recommender {
    pub fn new(classifier: Arc<MoodClassifier>, catalog: Arc<dyn TrackCatalog>) -> Self {
        Self {
            classifier,
            catalog,
        }
    }

    pub fn classifier(&self) -> &Arc<MoodClassifier> {
        &self.classifier
    }

    pub fn catalog(&self) -> &Arc<dyn TrackCatalog> {
        &self.catalog
    }

    /// Recommend for either a message or an explicit mood word
    pub async fn recommend(&self, mood_or_text: &str, is_explicit_mood: bool) -> RecommendationResult {
        if is_explicit_mood {
            self.recommend_for_command(Some(mood_or_text)).await
        } else {
            self.recommend_for_text(mood_or_text).await
        }
    }

    /// Handle the mood command. `None` means the argument was omitted.
    pub async fn recommend_for_command(&self, mood: Option<&str>) -> RecommendationResult {
        let Some(word) = mood else {
            debug!("Mood command without argument");
            return RecommendationResult::invalid(None);
        };

        match MoodLabel::from_command(word) {
            Some(label) => self.lookup(label, MoodSource::Requested).await,
            None => {
                debug!(given = %word, "Unknown mood requested");
                RecommendationResult::invalid(Some(word))
            }
        }
    }

    /// Classify a message and pick a track for the inferred mood
    pub async fn recommend_for_text(&self, text: &str) -> RecommendationResult {
        match self.classify(text).await {
            Ok(label) => self.lookup(label, MoodSource::Classified).await,
            Err(e) => {
                warn!(error = %e, "Mood classification failed");
                RecommendationResult::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Run the classifier off the async executor
    pub async fn classify(&self, text: &str) -> Result<MoodLabel, InferenceError> {
        let classifier = Arc::clone(&self.classifier);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || classifier.classify(&text))
            .await
            .map_err(|e| InferenceError::Task(e.to_string()))?
    }

    async fn lookup(&self, mood: MoodLabel, source: MoodSource) -> RecommendationResult {
        match self.catalog.sample_by_mood(mood).await {
            Ok(Some(track)) => {
                info!(%mood, ?source, track_id = %track.id, "Recommending track");
                RecommendationResult::Found {
                    mood,
                    source,
                    track: track.into(),
                    phrase: phrase_for(mood).display(),
                }
            }
            Ok(None) => {
                info!(%mood, "No track for mood");
                RecommendationResult::NotFound { mood }
            }
            Err(e) => {
                warn!(%mood, error = %e, "Catalog lookup failed");
                RecommendationResult::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}
