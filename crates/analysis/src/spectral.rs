use fretwise_audio::{bin_frequency, SpectrumAnalyzer};
use fretwise_domain::AudioBuffer;
use tracing::{debug, warn};

/// Dominant-frequency detection over a whole frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpectralEstimator;

impl SpectralEstimator {
    /// Frequency in Hz of the strongest bin of the Hann-windowed spectrum.
    ///
    /// Resolution is one bin, `sample_rate / len`. Returns `0.0` for an empty
    /// buffer.
    pub fn estimate(&self, buffer: &AudioBuffer) -> f32 {
        if buffer.is_empty() {
            return 0.0;
        }
        let len = buffer.len();
        let magnitudes = match SpectrumAnalyzer::new(len)
            .and_then(|mut analyzer| analyzer.magnitudes(buffer.samples()))
        {
            Ok(magnitudes) => magnitudes,
            Err(err) => {
                warn!(%err, "spectrum unavailable, reporting no pitch");
                return 0.0;
            }
        };

        let mut peak = 0;
        for (bin, magnitude) in magnitudes.iter().enumerate() {
            if *magnitude > magnitudes[peak] {
                peak = bin;
            }
        }
        let frequency = bin_frequency(peak, buffer.sample_rate(), len);
        debug!(len, peak, frequency, "estimated dominant frequency");
        frequency
    }
}

pub fn estimate_frequency(buffer: &AudioBuffer) -> f32 {
    SpectralEstimator.estimate(buffer)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> AudioBuffer {
        let samples = (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        AudioBuffer::new(samples, sample_rate).unwrap()
    }

    #[test]
    fn sine_is_found_within_one_bin() {
        for (freq, sample_rate, len) in [
            (82.41, 44_100, 22_050),
            (246.94, 44_100, 22_050),
            (329.63, 48_000, 24_000),
            (1000.0, 8_000, 4_096),
        ] {
            let estimate = estimate_frequency(&sine(freq, sample_rate, len));
            let bin_width = sample_rate as f32 / len as f32;
            assert!(
                (estimate - freq).abs() <= bin_width,
                "{freq} Hz estimated as {estimate} Hz"
            );
        }
    }

    #[test]
    fn one_second_of_a2_reads_110_hz() {
        let estimate = estimate_frequency(&sine(110.0, 44_100, 44_100));
        assert!((estimate - 110.0).abs() <= 1.0);
    }

    #[test]
    fn empty_and_silent_buffers_read_zero() {
        let empty = AudioBuffer::silent(44_100).unwrap();
        assert_eq!(estimate_frequency(&empty), 0.0);
        let silent = AudioBuffer::new(vec![0.0; 1024], 44_100).unwrap();
        assert_eq!(estimate_frequency(&silent), 0.0);
    }

    #[test]
    fn estimate_is_deterministic() {
        let buffer = sine(196.0, 44_100, 22_050);
        assert_eq!(estimate_frequency(&buffer), estimate_frequency(&buffer));
    }
}
