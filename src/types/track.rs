//! Catalog track records.

use serde::{Deserialize, Serialize};

use crate::mood::{derive_mood, MoodLabel};

/// A track as discovered in a playlist, before audio analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackListing {
    /// External track identifier
    pub id: String,
    /// Track title
    pub name: String,
    /// Primary artist name
    pub artist: String,
    /// Playlist the track was found in
    pub playlist_id: String,
    /// Link to the track
    pub track_url: String,
    /// Link to the source playlist
    pub playlist_url: String,
}

/// Continuous audio-analysis signals for one track, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub valence: f64,
    pub energy: f64,
    pub danceability: f64,
}

/// Returned when audio features fall outside `[0, 1]`
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Audio feature {name} out of range: {value}")]
pub struct InvalidFeatures {
    pub name: &'static str,
    pub value: f64,
}

impl AudioFeatures {
    /// Check every feature is a finite value in `[0, 1]`
    pub fn validate(&self) -> Result<(), InvalidFeatures> {
        for (name, value) in [
            ("valence", self.valence),
            ("energy", self.energy),
            ("danceability", self.danceability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(InvalidFeatures { name, value });
            }
        }
        Ok(())
    }

    /// Mood implied by valence and energy
    pub fn mood(&self) -> MoodLabel {
        derive_mood(self.valence, self.energy)
    }
}

/// One catalog entry.
///
/// The mood is derived once, when the track is built from its listing and
/// features, and is never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub playlist_id: String,
    pub valence: f64,
    pub energy: f64,
    pub danceability: f64,
    pub mood: MoodLabel,
    pub track_url: String,
    pub playlist_url: String,
}

impl Track {
    /// Combine a listing with its audio features, deriving the mood
    pub fn from_listing(listing: TrackListing, features: AudioFeatures) -> Self {
        Self {
            id: listing.id,
            name: listing.name,
            artist: listing.artist,
            playlist_id: listing.playlist_id,
            valence: features.valence,
            energy: features.energy,
            danceability: features.danceability,
            mood: features.mood(),
            track_url: listing.track_url,
            playlist_url: listing.playlist_url,
        }
    }
}
