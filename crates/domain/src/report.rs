use std::fmt;

use serde::{Deserialize, Serialize};

use crate::KeyEstimate;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InstrumentLabel {
    GuitarLike,
    Other,
}

impl InstrumentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GuitarLike => "guitar-like",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for InstrumentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenreLabel {
    Rock,
    Classical,
}

impl GenreLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rock => "rock",
            Self::Classical => "classical",
        }
    }
}

impl fmt::Display for GenreLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the offline analysis says about one clip.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ClassificationReport {
    pub instrument: InstrumentLabel,
    pub genre: GenreLabel,
    pub key: String,
    pub key_estimate: KeyEstimate,
    pub zero_crossing_rate: f32,
    /// Mean spectral centroid in Hz.
    pub spectral_centroid: f32,
    pub tempo_bpm: f32,
}

impl ClassificationReport {
    /// The three human-readable lines printed by the analyze command.
    pub fn lines(&self) -> [String; 3] {
        [
            format!("Instrument: {}", self.instrument),
            format!("Genre: {}", self.genre),
            format!("Key: {}", self.key),
        ]
    }
}
