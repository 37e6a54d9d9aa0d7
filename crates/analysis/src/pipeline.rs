use std::path::Path;

use anyhow::{Context, Result};
use fretwise_audio::{AudioDecoder, FeatureConfig, FeatureExtractor, SpectralFeatures};
use fretwise_domain::{AudioBuffer, ClassificationReport};
use tracing::{info, instrument, warn};

use crate::key::ToneProfileEstimator;
use crate::tempo::TempoClassifier;
use crate::timbre::TimbreClassifier;

pub struct AnalysisPipeline<F = SpectralFeatures> {
    timbre: TimbreClassifier<F>,
    tempo: TempoClassifier<F>,
    key: ToneProfileEstimator<F>,
}

impl AnalysisPipeline<SpectralFeatures> {
    pub fn new() -> Self {
        Self::with_config(FeatureConfig::default())
    }

    pub fn with_config(config: FeatureConfig) -> Self {
        Self::with_features(SpectralFeatures::new(config))
    }
}

impl Default for AnalysisPipeline<SpectralFeatures> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FeatureExtractor + Clone> AnalysisPipeline<F> {
    pub fn with_features(features: F) -> Self {
        Self {
            timbre: TimbreClassifier::new(features.clone()),
            tempo: TempoClassifier::new(features.clone()),
            key: ToneProfileEstimator::new(features),
        }
    }

    /// Decodes `path` once and analyzes the resulting clip.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<ClassificationReport> {
        let path = path.as_ref();
        info!("decoding clip");
        let clip = AudioDecoder::open(path)
            .with_context(|| format!("decode audio file {}", path.display()))?;
        self.analyze(&clip)
    }

    /// Runs the timbre, tempo and key analyses over the same clip.
    #[instrument(skip_all, fields(secs = clip.duration_secs(), sample_rate = clip.sample_rate()))]
    pub fn analyze(&self, clip: &AudioBuffer) -> Result<ClassificationReport> {
        if clip.is_empty() {
            warn!("clip has no samples, reporting neutral labels");
        }
        let timbre = self.timbre.measure(clip)?;
        let tempo = self.tempo.measure(clip)?;
        let key = self.key.estimate_key(clip)?;
        let report = ClassificationReport {
            instrument: timbre.label,
            genre: tempo.label,
            key: key.label(),
            key_estimate: key,
            zero_crossing_rate: timbre.zero_crossing_rate,
            spectral_centroid: timbre.spectral_centroid,
            tempo_bpm: tempo.bpm,
        };
        info!(
            instrument = %report.instrument,
            genre = %report.genre,
            key = %report.key,
            "analysis complete"
        );
        Ok(report)
    }
}
