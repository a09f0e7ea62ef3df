//! Mood labels and the rules that assign them.
//!
//! A [`MoodLabel`] comes from one of two places: the text classifier, which
//! produces a label index mapped through [`MoodLabel::CLASSIFIER_ORDER`], or
//! the catalog builder, which derives a label from a track's audio features
//! with [`derive_mood`].

pub mod phrases;

pub use phrases::{greeting, phrase_for, MoodPhrase, ALL_PHRASES};

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Closed set of moods shared by the classifier and the track catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Sad,
    Joy,
    Love,
    Angry,
    Neutral,
}

impl MoodLabel {
    /// Every label, in canonical order
    pub const ALL: [MoodLabel; 5] = [
        MoodLabel::Sad,
        MoodLabel::Joy,
        MoodLabel::Love,
        MoodLabel::Angry,
        MoodLabel::Neutral,
    ];

    /// Output order of the trained classifier head.
    ///
    /// Index `i` of the logits vector corresponds to `CLASSIFIER_ORDER[i]`.
    /// Indices past the end of this table resolve to [`MoodLabel::Neutral`].
    pub const CLASSIFIER_ORDER: [MoodLabel; 4] = [
        MoodLabel::Sad,
        MoodLabel::Joy,
        MoodLabel::Love,
        MoodLabel::Angry,
    ];

    /// Map a classifier output index to a label
    pub fn from_index(index: usize) -> Self {
        Self::CLASSIFIER_ORDER
            .get(index)
            .copied()
            .unwrap_or(MoodLabel::Neutral)
    }

    /// Lowercase identifier, as stored in the catalog
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Sad => "sad",
            MoodLabel::Joy => "joy",
            MoodLabel::Love => "love",
            MoodLabel::Angry => "angry",
            MoodLabel::Neutral => "neutral",
        }
    }

    /// Resolve a word typed as a mood command argument.
    ///
    /// Accepts the canonical identifiers plus [`COMMAND_ALIASES`].
    /// Matching ignores case and surrounding whitespace.
    pub fn from_command(word: &str) -> Option<Self> {
        let word = word.trim().to_lowercase();
        if let Ok(label) = word.parse() {
            return Some(label);
        }
        COMMAND_ALIASES
            .iter()
            .find(|(alias, _)| *alias == word)
            .map(|(_, label)| *label)
    }
}

impl std::fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the canonical mood identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown mood label: {0}")]
pub struct ParseMoodError(pub String);

impl FromStr for MoodLabel {
    type Err = ParseMoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sad" => Ok(MoodLabel::Sad),
            "joy" => Ok(MoodLabel::Joy),
            "love" => Ok(MoodLabel::Love),
            "angry" => Ok(MoodLabel::Angry),
            "neutral" => Ok(MoodLabel::Neutral),
            other => Err(ParseMoodError(other.to_string())),
        }
    }
}

/// Older command words still accepted for explicit mood requests.
///
/// `afraid` and `surprised` were once advertised as well but have no catalog
/// counterpart, so they are rejected.
pub const COMMAND_ALIASES: &[(&str, MoodLabel)] =
    &[("happy", MoodLabel::Joy), ("romantic", MoodLabel::Love)];

/// Words advertised to users of the explicit mood command
pub fn command_vocabulary() -> Vec<&'static str> {
    MoodLabel::ALL.iter().map(MoodLabel::as_str).collect()
}

// ============================================================================
// Audio-feature rule
// ============================================================================

/// Above this, valence or energy counts as high
pub const HIGH_THRESHOLD: f64 = 0.6;
/// Below this, valence or energy counts as low
pub const LOW_THRESHOLD: f64 = 0.4;

/// Derive a mood from a track's valence and energy (both in `[0, 1]`).
///
/// Rules are checked in order and the first match wins. The upper and lower
/// bands use strict comparisons while the middle band is inclusive on both
/// ends, so `(0.6, 0.6)` is `Love` and `(0.6, 0.7)` is `Neutral`.
pub fn derive_mood(valence: f64, energy: f64) -> MoodLabel {
    let middle = LOW_THRESHOLD..=HIGH_THRESHOLD;

    if valence > HIGH_THRESHOLD && energy > HIGH_THRESHOLD {
        MoodLabel::Joy
    } else if valence < LOW_THRESHOLD && energy < LOW_THRESHOLD {
        MoodLabel::Sad
    } else if valence < LOW_THRESHOLD && energy > HIGH_THRESHOLD {
        MoodLabel::Angry
    } else if middle.contains(&valence) && middle.contains(&energy) {
        MoodLabel::Love
    } else {
        MoodLabel::Neutral
    }
}
