//! Display phrases attached to each mood label.
//!
//! These are what the chat front end shows above a recommendation. Each label
//! has exactly one phrase and one emoji shortcode.

use super::MoodLabel;

/// A display phrase for one mood label
#[derive(Debug, Clone)]
pub struct MoodPhrase {
    /// Label this phrase belongs to
    pub mood: MoodLabel,
    /// Sentence shown to the user ("You seem ...")
    pub headline: &'static str,
    /// Emoji shortcode rendered by the chat platform
    pub emoji: &'static str,
}

impl MoodPhrase {
    /// Headline followed by the emoji marker
    pub fn display(&self) -> String {
        format!("{} {}", self.headline, self.emoji)
    }
}

// ============================================================================
// Phrases
// ============================================================================

pub const PHRASE_SAD: MoodPhrase = MoodPhrase {
    mood: MoodLabel::Sad,
    headline: "You seem a little sad",
    emoji: ":cry:",
};

pub const PHRASE_JOY: MoodPhrase = MoodPhrase {
    mood: MoodLabel::Joy,
    headline: "You seem happy",
    emoji: ":grin:",
};

pub const PHRASE_LOVE: MoodPhrase = MoodPhrase {
    mood: MoodLabel::Love,
    headline: "You seem full of love",
    emoji: ":heart_eyes:",
};

pub const PHRASE_ANGRY: MoodPhrase = MoodPhrase {
    mood: MoodLabel::Angry,
    headline: "You seem a little irritated",
    emoji: ":japanese_ogre:",
};

pub const PHRASE_NEUTRAL: MoodPhrase = MoodPhrase {
    mood: MoodLabel::Neutral,
    headline: "You seem neutral",
    emoji: ":neutral_face:",
};

/// All phrases, in `MoodLabel::ALL` order
pub const ALL_PHRASES: &[MoodPhrase] = &[
    PHRASE_SAD,
    PHRASE_JOY,
    PHRASE_LOVE,
    PHRASE_ANGRY,
    PHRASE_NEUTRAL,
];

/// Get the display phrase for a mood
pub fn phrase_for(mood: MoodLabel) -> &'static MoodPhrase {
    match mood {
        MoodLabel::Sad => &PHRASE_SAD,
        MoodLabel::Joy => &PHRASE_JOY,
        MoodLabel::Love => &PHRASE_LOVE,
        MoodLabel::Angry => &PHRASE_ANGRY,
        MoodLabel::Neutral => &PHRASE_NEUTRAL,
    }
}

/// Sent to the chat channel when the front end comes online
pub fn greeting(bot_name: &str) -> String {
    format!("Hello, I'm {bot_name}! I can recommend you songs based on your mood.")
}
