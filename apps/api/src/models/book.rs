use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel accepted by both filters meaning "do not filter".
pub const ALL: &str = "All";

/// Precomputed per-book emotion scores. Higher means stronger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores {
    pub joy: f32,
    pub surprise: f32,
    pub anger: f32,
    pub fear: f32,
    pub sadness: f32,
}

impl EmotionScores {
    pub fn score(&self, emotion: Emotion) -> f32 {
        match emotion {
            Emotion::Joy => self.joy,
            Emotion::Surprise => self.surprise,
            Emotion::Anger => self.anger,
            Emotion::Fear => self.fear,
            Emotion::Sadness => self.sadness,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Surprise,
    Anger,
    Fear,
    Sadness,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Joy,
        Emotion::Surprise,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Sadness,
    ];

    /// Column name in the metadata file.
    pub fn key(self) -> &'static str {
        match self {
            Emotion::Joy => "joy",
            Emotion::Surprise => "surprise",
            Emotion::Anger => "anger",
            Emotion::Fear => "fear",
            Emotion::Sadness => "sadness",
        }
    }
}

/// Emotional tone a user can rerank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tone {
    Happy,
    Surprising,
    Angry,
    Suspenseful,
    Sad,
}

impl Tone {
    /// Dropdown order.
    pub const ALL: [Tone; 5] = [
        Tone::Happy,
        Tone::Surprising,
        Tone::Angry,
        Tone::Suspenseful,
        Tone::Sad,
    ];

    pub fn emotion(self) -> Emotion {
        match self {
            Tone::Happy => Emotion::Joy,
            Tone::Surprising => Emotion::Surprise,
            Tone::Angry => Emotion::Anger,
            Tone::Suspenseful => Emotion::Fear,
            Tone::Sad => Emotion::Sadness,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tone::Happy => "Happy",
            Tone::Surprising => "Surprising",
            Tone::Angry => "Angry",
            Tone::Suspenseful => "Suspenseful",
            Tone::Sad => "Sad",
        }
    }

    /// Parse a tone filter value. `"All"` (or an empty string) means no tone.
    ///
    /// Both the display label (`"Happy"`) and the emotion key (`"joy"`) are
    /// accepted; anything else is an error.
    pub fn parse_filter(value: &str) -> Result<Option<Tone>, UnknownTone> {
        let value = value.trim();
        if value.is_empty() || value == ALL {
            return Ok(None);
        }
        value.parse().map(Some)
    }

    /// `"All"` followed by every tone label.
    pub fn choices() -> Vec<String> {
        std::iter::once(ALL)
            .chain(Tone::ALL.iter().map(|tone| tone.label()))
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTone(pub String);

impl fmt::Display for UnknownTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown tone '{}', expected one of: {}",
            self.0,
            Tone::choices().join(", ")
        )
    }
}

impl std::error::Error for UnknownTone {}

impl FromStr for Tone {
    type Err = UnknownTone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|tone| tone.label() == s || tone.emotion().key() == s)
            .ok_or_else(|| UnknownTone(s.to_string()))
    }
}

/// Category restriction for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    /// Exact, case-sensitive label match.
    Only(String),
}

impl CategoryFilter {
    pub fn parse(value: &str) -> Self {
        match value {
            "" | ALL => CategoryFilter::All,
            other => CategoryFilter::Only(other.to_string()),
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryFilter::All => ALL,
            CategoryFilter::Only(category) => category,
        }
    }
}

/// One row of the book metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub isbn13: u64,
    pub title: String,
    pub authors: Vec<String>,
    pub description: String,
    pub category: String,
    pub emotions: EmotionScores,
    /// Display-ready cover reference; never empty.
    pub cover_image: String,
}
