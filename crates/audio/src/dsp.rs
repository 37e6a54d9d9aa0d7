use std::f32::consts::PI;
use std::sync::Arc;

use fretwise_domain::DomainError;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::AudioError;

/// Symmetric Hann window: zero at both ends, one at the centre.
pub fn hann_window(len: usize) -> Vec<f32> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (len - 1) as f32;
            (0..len)
                .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / denom).cos())
                .collect()
        }
    }
}

/// Frequency in Hz at the centre of `bin` for a transform of `fft_len` points.
pub fn bin_frequency(bin: usize, sample_rate: u32, fft_len: usize) -> f32 {
    if fft_len == 0 {
        return 0.0;
    }
    (bin as f64 * sample_rate as f64 / fft_len as f64) as f32
}

/// Hann-windowed magnitude spectrum of fixed-length frames.
///
/// Planner output, window and scratch buffers are allocated once and reused
/// for every frame.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    output: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(len: usize) -> Result<Self, AudioError> {
        if len == 0 {
            return Err(DomainError::validation("spectrum length must be positive").into());
        }
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(len);
        let input = fft.make_input_vec();
        let output = fft.make_output_vec();
        Ok(Self {
            fft,
            window: hann_window(len),
            input,
            output,
        })
    }

    /// Number of magnitude bins produced per frame (`len / 2 + 1`).
    pub fn bins(&self) -> usize {
        self.output.len()
    }

    /// Magnitudes of `frame`, zero-padded or truncated to the analyzer length.
    pub fn magnitudes(&mut self, frame: &[f32]) -> Result<Vec<f32>, AudioError> {
        for (i, slot) in self.input.iter_mut().enumerate() {
            let sample = frame.get(i).copied().unwrap_or(0.0);
            *slot = sample * self.window[i];
        }
        self.fft
            .process(&mut self.input, &mut self.output)
            .map_err(|err| AudioError::Fft(err.to_string()))?;
        Ok(self.output.iter().map(|c| c.norm()).collect())
    }
}

/// Overlapping analysis frames over a sample slice.
///
/// Every frame starts `hop` samples after the previous one. The last frame
/// may be shorter than `frame_len`; consumers zero-pad it. An empty slice
/// yields no frames.
pub struct Frames<'a> {
    samples: &'a [f32],
    frame_len: usize,
    hop: usize,
    start: usize,
    done: bool,
}

impl<'a> Frames<'a> {
    pub fn new(samples: &'a [f32], frame_len: usize, hop: usize) -> Self {
        Self {
            samples,
            frame_len,
            hop,
            start: 0,
            done: samples.is_empty() || frame_len == 0 || hop == 0,
        }
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a [f32];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let end = (self.start + self.frame_len).min(self.samples.len());
        let frame = &self.samples[self.start..end];
        if self.start + self.frame_len >= self.samples.len() {
            self.done = true;
        } else {
            self.start += self.hop;
        }
        Some(frame)
    }
}
