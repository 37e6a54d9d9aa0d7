use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct TuningTarget {
    pub note: &'static str,
    /// Target pitch in Hz.
    pub frequency: f32,
}

/// Standard six-string guitar tuning, lowest string first.
pub static STANDARD_TUNING: [TuningTarget; 6] = [
    TuningTarget { note: "E2", frequency: 82.41 },
    TuningTarget { note: "A2", frequency: 110.00 },
    TuningTarget { note: "D3", frequency: 146.83 },
    TuningTarget { note: "G3", frequency: 196.00 },
    TuningTarget { note: "B3", frequency: 246.94 },
    TuningTarget { note: "E4", frequency: 329.63 },
];

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TuningDirection {
    /// Reads low; the string needs tightening.
    Flat,
    /// Reads high; the string needs loosening.
    Sharp,
    InTune,
}

impl TuningDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Sharp => "sharp",
            Self::InTune => "in-tune",
        }
    }
}

impl fmt::Display for TuningDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct TuningResult {
    pub note: &'static str,
    pub target: f32,
    pub frequency: f32,
    /// `frequency - target`, in Hz.
    pub deviation: f32,
    pub direction: TuningDirection,
}

impl fmt::Display for TuningResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.2} Hz ({:+.2} Hz) -> {}",
            self.note, self.frequency, self.deviation, self.direction
        )
    }
}
