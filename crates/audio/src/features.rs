use fretwise_domain::key::PITCH_CLASS_COUNT;
use fretwise_domain::{AudioBuffer, ChromaVector};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dsp::{bin_frequency, Frames, SpectrumAnalyzer};
use crate::AudioError;

/// Lowest and highest frequencies folded into the chroma vector (C1..C8).
const CHROMA_MIN_HZ: f32 = 32.70;
const CHROMA_MAX_HZ: f32 = 4186.01;

/// Autocorrelation peaks weaker than this are treated as "no pulse".
const MIN_TEMPO_CORRELATION: f32 = 0.05;
/// Lags within this many frames of a candidate count towards its score.
const LAG_TOLERANCE: usize = 2;
/// The shortest lag scoring at least this share of the strongest is the beat.
const BEAT_SCORE_RATIO: f32 = 0.8;
const MIN_ENVELOPE_FRAMES: usize = 16;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FeatureConfig {
    pub n_fft: usize,
    pub hop_length: usize,
    pub chroma_n_fft: usize,
    pub chroma_hop_length: usize,
    pub min_bpm: f32,
    pub max_bpm: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            n_fft: 2048,
            hop_length: 512,
            chroma_n_fft: 4096,
            chroma_hop_length: 2048,
            min_bpm: 50.0,
            max_bpm: 220.0,
        }
    }
}

/// Clip-level descriptors consumed by the heuristic classifiers.
pub trait FeatureExtractor {
    /// Mean fraction of adjacent sample pairs that change sign.
    fn zero_crossing_rate(&self, buffer: &AudioBuffer) -> Result<f32, AudioError>;
    /// Mean spectral centroid in Hz.
    fn spectral_centroid(&self, buffer: &AudioBuffer) -> Result<f32, AudioError>;
    /// Mean per-frame pitch-class energy.
    fn chroma(&self, buffer: &AudioBuffer) -> Result<ChromaVector, AudioError>;
    /// Tempo in beats per minute, `0.0` when no pulse is found.
    fn tempo(&self, buffer: &AudioBuffer) -> Result<f32, AudioError>;
}

/// Short-time Fourier transform based implementation of [`FeatureExtractor`].
#[derive(Clone, Debug, Default)]
pub struct SpectralFeatures {
    config: FeatureConfig,
}

impl SpectralFeatures {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Half-wave rectified spectral flux between consecutive frames,
    /// one value per frame after the first.
    pub fn onset_envelope(&self, buffer: &AudioBuffer) -> Result<Vec<f32>, AudioError> {
        if buffer.is_empty() {
            return Ok(Vec::new());
        }
        let mut analyzer = SpectrumAnalyzer::new(self.config.n_fft)?;
        let mut previous: Option<Vec<f32>> = None;
        let mut envelope = Vec::new();
        for frame in Frames::new(buffer.samples(), self.config.n_fft, self.config.hop_length) {
            let current: Vec<f32> = analyzer
                .magnitudes(frame)?
                .into_iter()
                .map(|m| m.ln_1p())
                .collect();
            if let Some(prev) = &previous {
                let flux = current
                    .iter()
                    .zip(prev.iter())
                    .map(|(now, before)| (now - before).max(0.0))
                    .sum::<f32>();
                envelope.push(flux);
            }
            previous = Some(current);
        }
        Ok(envelope)
    }

    /// Beat period read off the autocorrelation of the onset envelope.
    ///
    /// Each lag scores the correlation summed over its neighbours, so a
    /// period between two frame lags scores as well as its exact multiples.
    /// The shortest lag scoring close to the strongest is the beat, refined
    /// to a fraction of a frame.
    fn estimate_tempo_from_envelope(&self, envelope: &[f32], sample_rate: u32) -> f32 {
        if envelope.len() < MIN_ENVELOPE_FRAMES {
            return 0.0;
        }
        let frame_duration = self.config.hop_length as f32 / sample_rate as f32;
        let min_lag = ((60.0 / (self.config.max_bpm * frame_duration)).floor() as usize).max(1);
        let max_lag = ((60.0 / (self.config.min_bpm * frame_duration)).ceil() as usize)
            .min(envelope.len() / 2);
        if min_lag >= max_lag {
            return 0.0;
        }

        let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
        let centered: Vec<f32> = envelope.iter().map(|v| v - mean).collect();
        let energy: f32 = centered.iter().map(|v| v * v).sum();
        if energy < 1e-10 {
            return 0.0;
        }
        let last_lag = (max_lag + LAG_TOLERANCE).min(centered.len() - 1);
        let correlation: Vec<f32> = (0..=last_lag)
            .map(|lag| {
                centered[..centered.len() - lag]
                    .iter()
                    .zip(centered[lag..].iter())
                    .map(|(a, b)| a * b)
                    .sum::<f32>()
                    / energy
            })
            .collect();
        let neighbourhood = |lag: usize| {
            lag.saturating_sub(LAG_TOLERANCE).max(1)..=(lag + LAG_TOLERANCE).min(last_lag)
        };
        let score = |lag: usize| -> f32 { correlation[neighbourhood(lag)].iter().sum() };

        let scores: Vec<f32> = (min_lag..=max_lag).map(score).collect();
        let strongest = scores.iter().fold(f32::NEG_INFINITY, |acc, v| acc.max(*v));
        if strongest < MIN_TEMPO_CORRELATION {
            return 0.0;
        }
        let Some(first) = scores
            .iter()
            .position(|value| *value >= BEAT_SCORE_RATIO * strongest)
        else {
            return 0.0;
        };

        let mut peak = min_lag + first;
        while peak < max_lag && score(peak + 1) > score(peak) {
            peak += 1;
        }

        let (weighted, weight) = neighbourhood(peak).fold((0.0f32, 0.0f32), |(sum, total), lag| {
            let value = correlation[lag].max(0.0);
            (sum + lag as f32 * value, total + value)
        });
        let lag = if weight > 1e-10 {
            weighted / weight
        } else {
            peak as f32
        };
        60.0 / (lag * frame_duration)
    }
}

impl FeatureExtractor for SpectralFeatures {
    fn zero_crossing_rate(&self, buffer: &AudioBuffer) -> Result<f32, AudioError> {
        let frame_len = self.config.n_fft;
        let mut total = 0.0;
        let mut count = 0usize;
        for frame in Frames::new(buffer.samples(), frame_len, self.config.hop_length) {
            let crossings = frame
                .windows(2)
                .filter(|pair| (pair[0] < 0.0) != (pair[1] < 0.0))
                .count();
            total += crossings as f32 / frame_len as f32;
            count += 1;
        }
        Ok(if count == 0 { 0.0 } else { total / count as f32 })
    }

    fn spectral_centroid(&self, buffer: &AudioBuffer) -> Result<f32, AudioError> {
        if buffer.is_empty() {
            return Ok(0.0);
        }
        let n_fft = self.config.n_fft;
        let mut analyzer = SpectrumAnalyzer::new(n_fft)?;
        let mut total = 0.0;
        let mut count = 0usize;
        for frame in Frames::new(buffer.samples(), n_fft, self.config.hop_length) {
            let magnitudes = analyzer.magnitudes(frame)?;
            let weight: f32 = magnitudes.iter().sum();
            if weight > 0.0 {
                let weighted: f32 = magnitudes
                    .iter()
                    .enumerate()
                    .map(|(bin, m)| bin_frequency(bin, buffer.sample_rate(), n_fft) * m)
                    .sum();
                total += weighted / weight;
            }
            count += 1;
        }
        Ok(if count == 0 { 0.0 } else { total / count as f32 })
    }

    fn chroma(&self, buffer: &AudioBuffer) -> Result<ChromaVector, AudioError> {
        if buffer.is_empty() {
            return Ok(ChromaVector::zeros());
        }
        let n_fft = self.config.chroma_n_fft;
        let mut analyzer = SpectrumAnalyzer::new(n_fft)?;
        let pitch_of_bin: Vec<Option<usize>> = (0..analyzer.bins())
            .map(|bin| pitch_class_of(bin_frequency(bin, buffer.sample_rate(), n_fft)))
            .collect();

        let frames: Vec<&[f32]> =
            Frames::new(buffer.samples(), n_fft, self.config.chroma_hop_length).collect();
        let mut chromagram = Array2::<f32>::zeros((PITCH_CLASS_COUNT, frames.len()));
        for (column, frame) in frames.iter().enumerate() {
            let magnitudes = analyzer.magnitudes(frame)?;
            for (bin, magnitude) in magnitudes.iter().enumerate() {
                if let Some(pitch) = pitch_of_bin[bin] {
                    chromagram[[pitch, column]] += magnitude * magnitude;
                }
            }
            let mut col = chromagram.column_mut(column);
            let peak = col.fold(0.0f32, |acc, v| acc.max(*v));
            if peak > 0.0 {
                col.mapv_inplace(|v| v / peak);
            }
        }

        let mean = chromagram
            .mean_axis(Axis(1))
            .unwrap_or_else(|| ndarray::Array1::zeros(PITCH_CLASS_COUNT));
        let mut values = [0.0f32; PITCH_CLASS_COUNT];
        for (slot, value) in values.iter_mut().zip(mean.iter()) {
            *slot = *value;
        }
        debug!(frames = frames.len(), ?values, "computed chroma");
        Ok(ChromaVector::new(values)?)
    }

    fn tempo(&self, buffer: &AudioBuffer) -> Result<f32, AudioError> {
        let envelope = self.onset_envelope(buffer)?;
        let bpm = self.estimate_tempo_from_envelope(&envelope, buffer.sample_rate());
        debug!(envelope_frames = envelope.len(), bpm, "estimated tempo");
        Ok(bpm)
    }
}

/// Pitch class (C = 0) nearest to `freq`, or `None` outside the chroma range.
fn pitch_class_of(freq: f32) -> Option<usize> {
    if !(CHROMA_MIN_HZ..=CHROMA_MAX_HZ).contains(&freq) {
        return None;
    }
    let midi = 69.0 + 12.0 * (freq / 440.0).log2();
    Some((midi.round() as i64).rem_euclid(PITCH_CLASS_COUNT as i64) as usize)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;
    use approx::assert_abs_diff_eq;

    fn tone(freq: f32, sample_rate: u32, secs: f32) -> AudioBuffer {
        let len = (sample_rate as f32 * secs) as usize;
        let samples = (0..len)
            .map(|i| 0.5 * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        AudioBuffer::new(samples, sample_rate).unwrap()
    }

    fn clicks(bpm: f32, sample_rate: u32, secs: f32) -> AudioBuffer {
        let len = (sample_rate as f32 * secs) as usize;
        let period = (60.0 / bpm * sample_rate as f32) as usize;
        let click_len = sample_rate as usize / 50;
        let mut samples = vec![0.0f32; len];
        let mut start = 0;
        while start < len {
            for i in 0..click_len.min(len - start) {
                let t = i as f32 / sample_rate as f32;
                samples[start + i] = (2.0 * PI * 1000.0 * t).sin() * (-t * 200.0).exp();
            }
            start += period;
        }
        AudioBuffer::new(samples, sample_rate).unwrap()
    }

    #[test]
    fn empty_buffer_yields_neutral_features() {
        let features = SpectralFeatures::default();
        let empty = AudioBuffer::silent(44_100).unwrap();
        assert_eq!(features.zero_crossing_rate(&empty).unwrap(), 0.0);
        assert_eq!(features.spectral_centroid(&empty).unwrap(), 0.0);
        assert_eq!(features.chroma(&empty).unwrap(), ChromaVector::zeros());
        assert_eq!(features.tempo(&empty).unwrap(), 0.0);
    }

    #[test]
    fn zero_crossing_rate_tracks_pitch() {
        let features = SpectralFeatures::default();
        let zcr = features
            .zero_crossing_rate(&tone(441.0, 44_100, 1.0))
            .unwrap();
        assert_abs_diff_eq!(zcr, 2.0 * 441.0 / 44_100.0, epsilon = 2e-3);
    }

    #[test]
    fn centroid_of_pure_tone_sits_near_tone() {
        let features = SpectralFeatures::default();
        let centroid = features.spectral_centroid(&tone(1000.0, 44_100, 1.0)).unwrap();
        assert!((centroid - 1000.0).abs() < 150.0, "centroid {centroid}");
    }

    #[test]
    fn chroma_of_a440_peaks_on_a() {
        let features = SpectralFeatures::default();
        let chroma = features.chroma(&tone(440.0, 44_100, 1.0)).unwrap();
        assert_eq!(chroma.dominant().name(), "A");
        assert!(chroma.values().iter().all(|v| *v >= 0.0 && *v <= 1.0));
    }

    #[test]
    fn pitch_class_mapping() {
        assert_eq!(pitch_class_of(440.0), Some(9));
        assert_eq!(pitch_class_of(261.63), Some(0));
        assert_eq!(pitch_class_of(20.0), None);
        assert_eq!(pitch_class_of(8000.0), None);
    }

    #[test]
    fn tempo_of_click_track() {
        let features = SpectralFeatures::default();
        for sample_rate in [22_050, 44_100, 48_000] {
            for bpm in [80.0, 105.0, 120.0, 128.0, 140.0, 180.0] {
                let tempo = features.tempo(&clicks(bpm, sample_rate, 10.0)).unwrap();
                assert!(
                    (tempo - bpm).abs() < bpm * 0.05,
                    "{bpm} bpm at {sample_rate} Hz read as {tempo}"
                );
            }
        }
    }

    #[test]
    fn tempo_does_not_depend_on_clip_length() {
        let features = SpectralFeatures::default();
        for secs in [6.0, 8.0, 10.0, 12.0] {
            let tempo = features.tempo(&clicks(128.0, 44_100, secs)).unwrap();
            assert!((tempo - 128.0).abs() < 6.4, "{secs} s clip read as {tempo}");
        }
    }

    #[test]
    fn silence_has_no_tempo() {
        let features = SpectralFeatures::default();
        let silence = AudioBuffer::new(vec![0.0; 44_100 * 4], 44_100).unwrap();
        assert_eq!(features.tempo(&silence).unwrap(), 0.0);
    }
}
