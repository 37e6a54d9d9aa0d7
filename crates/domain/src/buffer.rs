use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Mono audio samples together with the rate they were recorded at.
///
/// Every sample is finite, so analyses never see NaN or infinite input.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, DomainError> {
        if sample_rate == 0 {
            return Err(DomainError::validation(
                "audio buffer sample rate must be positive",
            ));
        }
        if let Some(index) = samples.iter().position(|v| !v.is_finite()) {
            return Err(DomainError::validation(format!(
                "audio sample {index} is not finite"
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// An empty buffer at the given rate. Analyses treat it as silence.
    pub fn silent(sample_rate: u32) -> Result<Self, DomainError> {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length of the buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_sample_rate() {
        assert!(AudioBuffer::new(vec![0.0; 4], 0).is_err());
        assert!(AudioBuffer::silent(0).is_err());
    }

    #[test]
    fn rejects_non_finite_samples() {
        let err = AudioBuffer::new(vec![0.1, f32::NAN, 0.2], 44_100).unwrap_err();
        assert!(err.to_string().contains("sample 1"), "{err}");
        assert!(AudioBuffer::new(vec![f32::INFINITY], 44_100).is_err());
        assert!(AudioBuffer::new(vec![f32::NEG_INFINITY, 0.0], 44_100).is_err());
    }

    #[test]
    fn reports_duration() {
        let buffer = AudioBuffer::new(vec![0.0; 22_050], 44_100).unwrap();
        assert_eq!(buffer.len(), 22_050);
        assert!((buffer.duration_secs() - 0.5).abs() < 1e-9);
        assert!(AudioBuffer::silent(44_100).unwrap().is_empty());
    }
}
