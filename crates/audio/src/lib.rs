pub mod backend;
pub mod dsp;
pub mod error;
pub mod features;
pub mod io;

pub use backend::{CaptureConfig, CaptureSource, CpalCapture};
pub use dsp::{bin_frequency, hann_window, Frames, SpectrumAnalyzer};
pub use error::AudioError;
pub use features::{FeatureConfig, FeatureExtractor, SpectralFeatures};
pub use io::AudioDecoder;
