use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// The closed set of emotion labels a classifier scores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    /// Canonical order. Ties for the dominant label go to the earliest entry.
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown emotion label: {0}")]
pub struct UnknownEmotion(pub String);

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownEmotion(s.to_string()))
    }
}

/// One score per [`Emotion`], conventionally a percentage.
///
/// Scores are always finite and non-negative: anything else a classifier
/// reports is stored as 0, as is any label it leaves out. Serialized as a
/// map keyed by label, in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(from = "HashMap<Emotion, f64>")]
pub struct EmotionScores {
    scores: [f64; 7],
}

impl EmotionScores {
    /// Builds scores from `(label, score)` pairs; a repeated label keeps its last score.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Emotion, f64)>,
    {
        let mut scores = [0.0; 7];
        for (emotion, score) in pairs {
            scores[emotion.index()] = sanitize(score);
        }
        Self { scores }
    }

    /// Every label at 0 except `neutral` at 100.
    ///
    /// Substituted whenever a face cannot be classified, so every face still
    /// has a usable dominant label.
    pub fn fallback() -> Self {
        Self::from_pairs([(Emotion::Neutral, 100.0)])
    }

    pub fn get(&self, emotion: Emotion) -> f64 {
        self.scores[emotion.index()]
    }

    /// `(label, score)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.into_iter().map(|e| (e, self.get(e)))
    }

    /// Highest-scoring label and its score; the earliest label in
    /// canonical order wins a tie.
    pub fn dominant(&self) -> (Emotion, f64) {
        let mut best = (Emotion::ALL[0], self.get(Emotion::ALL[0]));
        for (emotion, score) in self.iter().skip(1) {
            if score > best.1 {
                best = (emotion, score);
            }
        }
        best
    }
}

impl From<HashMap<Emotion, f64>> for EmotionScores {
    fn from(map: HashMap<Emotion, f64>) -> Self {
        Self::from_pairs(map)
    }
}

impl Serialize for EmotionScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Emotion::ALL.len()))?;
        for (emotion, score) in self.iter() {
            map.serialize_entry(emotion.as_str(), &score)?;
        }
        map.end()
    }
}

fn sanitize(score: f64) -> f64 {
    if score.is_finite() && score > 0.0 {
        score
    } else {
        0.0
    }
}
