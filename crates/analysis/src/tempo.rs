use anyhow::Result;
use fretwise_audio::{FeatureExtractor, SpectralFeatures};
use fretwise_domain::{AudioBuffer, GenreLabel};
use serde::Serialize;
use tracing::debug;

/// Clips faster than this many beats per minute are labelled rock.
pub const ROCK_MIN_BPM: f32 = 100.0;

#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
pub struct TempoMeasurement {
    pub bpm: f32,
    pub label: GenreLabel,
}

/// Tempo-threshold genre heuristic; not a trained model.
#[derive(Clone, Debug, Default)]
pub struct TempoClassifier<F = SpectralFeatures> {
    features: F,
}

impl<F: FeatureExtractor> TempoClassifier<F> {
    pub fn new(features: F) -> Self {
        Self { features }
    }

    pub fn label_for(bpm: f32) -> GenreLabel {
        if bpm > ROCK_MIN_BPM {
            GenreLabel::Rock
        } else {
            GenreLabel::Classical
        }
    }

    pub fn measure(&self, clip: &AudioBuffer) -> Result<TempoMeasurement> {
        let bpm = if clip.is_empty() {
            0.0
        } else {
            self.features.tempo(clip)?
        };
        let label = Self::label_for(bpm);
        debug!(bpm, %label, "classified genre");
        Ok(TempoMeasurement { bpm, label })
    }

    pub fn classify_genre(&self, clip: &AudioBuffer) -> Result<GenreLabel> {
        Ok(self.measure(clip)?.label)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    type Classifier = TempoClassifier<SpectralFeatures>;

    fn click_track(bpm: f32, sample_rate: u32, secs: f32) -> AudioBuffer {
        let len = (sample_rate as f32 * secs) as usize;
        let period = (60.0 / bpm * sample_rate as f32) as usize;
        let mut samples = vec![0.0f32; len];
        for start in (0..len).step_by(period) {
            for i in 0..(sample_rate as usize / 50).min(len - start) {
                let t = i as f32 / sample_rate as f32;
                samples[start + i] = (2.0 * PI * 1000.0 * t).sin() * (-t * 200.0).exp();
            }
        }
        AudioBuffer::new(samples, sample_rate).unwrap()
    }

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(Classifier::label_for(ROCK_MIN_BPM), GenreLabel::Classical);
        assert_eq!(Classifier::label_for(100.5), GenreLabel::Rock);
        assert_eq!(Classifier::label_for(0.0), GenreLabel::Classical);
    }

    #[test]
    fn fast_clicks_are_rock() {
        let classifier = Classifier::default();
        for sample_rate in [22_050, 44_100, 48_000] {
            for bpm in [105.0, 120.0, 128.0, 140.0, 180.0] {
                let clip = click_track(bpm, sample_rate, 10.0);
                let measurement = classifier.measure(&clip).unwrap();
                assert_eq!(
                    measurement.label,
                    GenreLabel::Rock,
                    "{bpm} bpm at {sample_rate} Hz read as {}",
                    measurement.bpm
                );
            }
        }
    }

    #[test]
    fn slow_clicks_are_classical() {
        let classifier = Classifier::default();
        for sample_rate in [22_050, 48_000] {
            let clip = click_track(72.0, sample_rate, 10.0);
            let measurement = classifier.measure(&clip).unwrap();
            assert_eq!(measurement.label, GenreLabel::Classical, "tempo {}", measurement.bpm);
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let clip = click_track(90.0, 22_050, 6.0);
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify_genre(&clip).unwrap(),
            classifier.classify_genre(&clip).unwrap()
        );
    }

    #[test]
    fn empty_clip_is_classical() {
        let measurement = Classifier::default()
            .measure(&AudioBuffer::silent(44_100).unwrap())
            .unwrap();
        assert_eq!(measurement.bpm, 0.0);
        assert_eq!(measurement.label, GenreLabel::Classical);
    }
}
