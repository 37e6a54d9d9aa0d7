pub mod key;
pub mod pipeline;
pub mod spectral;
pub mod tempo;
pub mod timbre;
pub mod tuning;

pub use key::{estimate_key_from_chroma, ToneProfileEstimator};
pub use pipeline::AnalysisPipeline;
pub use spectral::{estimate_frequency, SpectralEstimator};
pub use tempo::{TempoClassifier, TempoMeasurement};
pub use timbre::{TimbreClassifier, TimbreMeasurement};
pub use tuning::{map_to_target, TuningMapper};
