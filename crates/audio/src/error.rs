use std::path::PathBuf;
use std::time::Duration;

use fretwise_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("capture timed out after {waited:?} with {captured} of {expected} samples")]
    CaptureTimeout {
        expected: usize,
        captured: usize,
        waited: Duration,
    },
    #[error("open audio file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decode audio file {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("spectrum computation failed: {0}")]
    Fft(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AudioError {
    pub fn decode<P: Into<PathBuf>, T: ToString>(path: P, reason: T) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
