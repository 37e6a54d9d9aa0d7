use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DomainError;

pub const PITCH_CLASS_COUNT: usize = 12;

pub const NOTE_NAMES: [&str; PITCH_CLASS_COUNT] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Krumhansl-Kessler major key profile, tonic at index 0.
pub const MAJOR_PROFILE: [f32; PITCH_CLASS_COUNT] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl-Kessler minor key profile, tonic at index 0.
pub const MINOR_PROFILE: [f32; PITCH_CLASS_COUNT] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// One of the twelve octave-independent note names, C = 0.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PitchClass(u8);

impl PitchClass {
    pub fn new(index: usize) -> Result<Self, DomainError> {
        if index >= PITCH_CLASS_COUNT {
            return Err(DomainError::validation(format!(
                "pitch class index {index} out of range"
            )));
        }
        Ok(Self(index as u8))
    }

    /// Wraps any index onto the twelve pitch classes.
    pub fn wrapping(index: usize) -> Self {
        Self((index % PITCH_CLASS_COUNT) as u8)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn name(&self) -> &'static str {
        NOTE_NAMES[self.index()]
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    pub fn profile(&self) -> &'static [f32; PITCH_CLASS_COUNT] {
        match self {
            Self::Major => &MAJOR_PROFILE,
            Self::Minor => &MINOR_PROFILE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Key {
    pub tonic: PitchClass,
    pub mode: Mode,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tonic.name(), self.mode.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct KeyEstimate {
    /// `None` when no candidate produced a defined correlation.
    pub key: Option<Key>,
    pub score: f32,
}

impl KeyEstimate {
    pub const UNKNOWN_LABEL: &'static str = "unknown";

    pub fn unknown() -> Self {
        Self {
            key: None,
            score: f32::NEG_INFINITY,
        }
    }

    pub fn label(&self) -> String {
        match self.key {
            Some(key) => key.to_string(),
            None => Self::UNKNOWN_LABEL.to_string(),
        }
    }
}

/// Per-pitch-class energy, C through B.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ChromaVector([f32; PITCH_CLASS_COUNT]);

impl ChromaVector {
    pub fn new(values: [f32; PITCH_CLASS_COUNT]) -> Result<Self, DomainError> {
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(DomainError::validation(
                "chroma energies must be finite and non-negative",
            ));
        }
        Ok(Self(values))
    }

    pub fn zeros() -> Self {
        Self([0.0; PITCH_CLASS_COUNT])
    }

    pub fn values(&self) -> &[f32; PITCH_CLASS_COUNT] {
        &self.0
    }

    /// Index of the strongest pitch class; the first one wins on ties.
    pub fn dominant(&self) -> PitchClass {
        let mut best = 0;
        for (index, value) in self.0.iter().enumerate() {
            if *value > self.0[best] {
                best = index;
            }
        }
        PitchClass::wrapping(best)
    }
}
