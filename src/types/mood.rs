//! API types for mood classification operations.
//!
//! This module contains request/response types for classifying a message
//! and listing the mood labels with their display phrases.

use serde::{Deserialize, Serialize};

use crate::inference::MoodPrediction;
use crate::mood::{phrase_for, MoodLabel, COMMAND_ALIASES};

/// Request to classify the mood of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodClassifyRequest {
    pub text: String,
}

/// Response from mood classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodClassifyResponse {
    #[serde(flatten)]
    pub prediction: MoodPrediction,
    /// Display phrase for the winning label
    pub phrase: String,
}

impl From<MoodPrediction> for MoodClassifyResponse {
    fn from(prediction: MoodPrediction) -> Self {
        let phrase = phrase_for(prediction.label).display();
        Self { prediction, phrase }
    }
}

/// Info about a single mood label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodInfo {
    pub id: MoodLabel,
    /// Classifier output index, if the model can produce this label directly
    pub index: Option<usize>,
    pub headline: String,
    pub emoji: String,
}

impl MoodInfo {
    pub fn for_label(label: MoodLabel) -> Self {
        let phrase = phrase_for(label);
        Self {
            id: label,
            index: MoodLabel::CLASSIFIER_ORDER.iter().position(|&l| l == label),
            headline: phrase.headline.to_string(),
            emoji: phrase.emoji.to_string(),
        }
    }
}

/// An extra word accepted by the mood command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodAlias {
    pub word: String,
    pub mood: MoodLabel,
}

/// Response listing available moods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMoodsResponse {
    pub moods: Vec<MoodInfo>,
    /// Words advertised for the mood command
    pub vocabulary: Vec<String>,
    pub aliases: Vec<MoodAlias>,
}

impl ListMoodsResponse {
    pub fn current() -> Self {
        Self {
            moods: MoodLabel::ALL.iter().copied().map(MoodInfo::for_label).collect(),
            vocabulary: crate::mood::command_vocabulary()
                .into_iter()
                .map(str::to_string)
                .collect(),
            aliases: COMMAND_ALIASES
                .iter()
                .map(|&(word, mood)| MoodAlias {
                    word: word.to_string(),
                    mood,
                })
                .collect(),
        }
    }
}
