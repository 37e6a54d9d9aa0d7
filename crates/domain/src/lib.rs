pub mod buffer;
pub mod error;
pub mod key;
pub mod report;
pub mod tuning;

pub use crate::buffer::AudioBuffer;
pub use crate::error::DomainError;
pub use crate::key::{ChromaVector, Key, KeyEstimate, Mode, PitchClass, MAJOR_PROFILE, MINOR_PROFILE};
pub use crate::report::{ClassificationReport, GenreLabel, InstrumentLabel};
pub use crate::tuning::{TuningDirection, TuningResult, TuningTarget, STANDARD_TUNING};
