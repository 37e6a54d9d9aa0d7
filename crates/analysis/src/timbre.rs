use anyhow::Result;
use fretwise_audio::{FeatureExtractor, SpectralFeatures};
use fretwise_domain::{AudioBuffer, InstrumentLabel};
use serde::Serialize;
use tracing::debug;

/// Clips darker than this (mean spectral centroid, Hz) may be guitar-like.
pub const GUITAR_MAX_CENTROID_HZ: f32 = 2000.0;
/// Clips with fewer sign changes per sample than this may be guitar-like.
pub const GUITAR_MAX_ZERO_CROSSING_RATE: f32 = 0.1;
/// Shorter clips have no sample pair to cross zero and a Hann frame that
/// windows every sample to zero, so they carry no timbre.
pub const MIN_TIMBRE_SAMPLES: usize = 2;

#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct TimbreMeasurement {
    pub zero_crossing_rate: f32,
    pub spectral_centroid: f32,
    pub label: InstrumentLabel,
}

/// Fixed-threshold instrument heuristic over brightness features.
///
/// Not a trained model: a clip is guitar-like exactly when both its mean
/// centroid and its mean zero-crossing rate fall strictly below the
/// thresholds above.
#[derive(Clone, Debug, Default)]
pub struct TimbreClassifier<F = SpectralFeatures> {
    features: F,
}

impl<F: FeatureExtractor> TimbreClassifier<F> {
    pub fn new(features: F) -> Self {
        Self { features }
    }

    pub fn label_for(zero_crossing_rate: f32, spectral_centroid: f32) -> InstrumentLabel {
        if spectral_centroid < GUITAR_MAX_CENTROID_HZ
            && zero_crossing_rate < GUITAR_MAX_ZERO_CROSSING_RATE
        {
            InstrumentLabel::GuitarLike
        } else {
            InstrumentLabel::Other
        }
    }

    pub fn measure(&self, clip: &AudioBuffer) -> Result<TimbreMeasurement> {
        if clip.len() < MIN_TIMBRE_SAMPLES {
            return Ok(TimbreMeasurement {
                zero_crossing_rate: 0.0,
                spectral_centroid: 0.0,
                label: InstrumentLabel::Other,
            });
        }
        let zero_crossing_rate = self.features.zero_crossing_rate(clip)?;
        let spectral_centroid = self.features.spectral_centroid(clip)?;
        let label = Self::label_for(zero_crossing_rate, spectral_centroid);
        debug!(zero_crossing_rate, spectral_centroid, %label, "classified timbre");
        Ok(TimbreMeasurement {
            zero_crossing_rate,
            spectral_centroid,
            label,
        })
    }

    pub fn classify_instrument(&self, clip: &AudioBuffer) -> Result<InstrumentLabel> {
        Ok(self.measure(clip)?.label)
    }
}
