use anyhow::Result;
use fretwise_audio::{FeatureExtractor, SpectralFeatures};
use fretwise_domain::key::PITCH_CLASS_COUNT;
use fretwise_domain::{AudioBuffer, ChromaVector, Key, KeyEstimate, Mode, PitchClass};
use tracing::debug;

/// Key detection by correlating clip chroma against rotated key profiles.
#[derive(Clone, Debug, Default)]
pub struct ToneProfileEstimator<F = SpectralFeatures> {
    features: F,
}

impl<F: FeatureExtractor> ToneProfileEstimator<F> {
    pub fn new(features: F) -> Self {
        Self { features }
    }

    pub fn estimate_key(&self, clip: &AudioBuffer) -> Result<KeyEstimate> {
        if clip.is_empty() {
            return Ok(KeyEstimate::unknown());
        }
        let chroma = self.features.chroma(clip)?;
        debug!(dominant = chroma.dominant().name(), "clip chroma");
        Ok(estimate_key_from_chroma(&chroma))
    }
}

/// Best of the 24 major/minor candidates for `chroma`.
///
/// Candidates are visited tonic C to B, major before minor; a later candidate
/// replaces the best only with a strictly higher score. Candidates whose
/// correlation is undefined (flat chroma) score negative infinity, so an
/// all-flat input stays unknown.
pub fn estimate_key_from_chroma(chroma: &ChromaVector) -> KeyEstimate {
    let candidates = (0..PITCH_CLASS_COUNT).flat_map(|tonic| {
        [Mode::Major, Mode::Minor].into_iter().map(move |mode| {
            let profile = rotate(mode.profile(), tonic);
            let score = pearson(&profile, chroma.values())
                .map(|r| r as f32)
                .unwrap_or(f32::NEG_INFINITY);
            let key = Key {
                tonic: PitchClass::wrapping(tonic),
                mode,
            };
            (key, score)
        })
    });
    strongest(candidates)
}

/// Running strict maximum; on equal scores the earlier candidate stays.
fn strongest(candidates: impl IntoIterator<Item = (Key, f32)>) -> KeyEstimate {
    let mut best = KeyEstimate::unknown();
    for (key, score) in candidates {
        if score > best.score {
            best = KeyEstimate {
                key: Some(key),
                score,
            };
        }
    }
    best
}

/// Shifts a tonic-at-zero profile so its tonic lands on `tonic`.
fn rotate(profile: &[f32; PITCH_CLASS_COUNT], tonic: usize) -> [f32; PITCH_CLASS_COUNT] {
    let mut rotated = [0.0; PITCH_CLASS_COUNT];
    for (index, slot) in rotated.iter_mut().enumerate() {
        *slot = profile[(index + PITCH_CLASS_COUNT - tonic) % PITCH_CLASS_COUNT];
    }
    rotated
}

fn pearson(a: &[f32], b: &[f32]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }
    let mean_a = a[..n].iter().map(|v| *v as f64).sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().map(|v| *v as f64).sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a[..n].iter().zip(b[..n].iter()) {
        let dx = *x as f64 - mean_a;
        let dy = *y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }
    let r = cov / (var_a * var_b).sqrt();
    r.is_finite().then_some(r)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;
    use approx::assert_abs_diff_eq;
    use fretwise_domain::{MAJOR_PROFILE, MINOR_PROFILE};

    #[test]
    fn rotated_major_profile_is_recovered() {
        for tonic in 0..PITCH_CLASS_COUNT {
            let chroma = ChromaVector::new(rotate(&MAJOR_PROFILE, tonic)).unwrap();
            let estimate = estimate_key_from_chroma(&chroma);
            let key = estimate.key.unwrap();
            assert_eq!(key.tonic.index(), tonic);
            assert_eq!(key.mode, Mode::Major);
            assert_abs_diff_eq!(estimate.score, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn rotated_minor_profile_is_recovered() {
        let chroma = ChromaVector::new(rotate(&MINOR_PROFILE, 2)).unwrap();
        let estimate = estimate_key_from_chroma(&chroma);
        assert_eq!(estimate.label(), "D minor");
        assert_abs_diff_eq!(estimate.score, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn flat_chroma_is_unknown() {
        let flat = ChromaVector::new([0.5; PITCH_CLASS_COUNT]).unwrap();
        let estimate = estimate_key_from_chroma(&flat);
        assert!(estimate.key.is_none());
        assert_eq!(estimate.score, f32::NEG_INFINITY);
        assert_eq!(estimate_key_from_chroma(&ChromaVector::zeros()).label(), "unknown");
    }

    fn key(tonic: usize, mode: Mode) -> Key {
        Key {
            tonic: PitchClass::wrapping(tonic),
            mode,
        }
    }

    #[test]
    fn tied_scores_keep_the_earlier_candidate() {
        let estimate = strongest([
            (key(0, Mode::Major), 0.5),
            (key(0, Mode::Minor), 0.7),
            (key(1, Mode::Major), 0.7),
        ]);
        assert_eq!(estimate.label(), "C minor");

        let estimate = strongest([(key(4, Mode::Major), 0.9), (key(4, Mode::Minor), 0.9)]);
        assert_eq!(estimate.label(), "E major");
    }

    #[test]
    fn undefined_scores_never_win() {
        let estimate = strongest([
            (key(0, Mode::Major), f32::NEG_INFINITY),
            (key(3, Mode::Minor), -0.2),
        ]);
        assert_eq!(estimate.label(), "D# minor");
        assert_eq!(strongest(Vec::new()).label(), "unknown");
    }

    #[test]
    fn symmetric_chroma_resolves_to_lower_tonic() {
        // Repeats every half octave, so D minor and G# minor score alike.
        let mut values = [0.0; PITCH_CLASS_COUNT];
        values[2] = 1.0;
        values[8] = 1.0;
        values[4] = 0.3;
        values[10] = 0.3;
        let chroma = ChromaVector::new(values).unwrap();
        let d_minor = pearson(&rotate(&MINOR_PROFILE, 2), chroma.values()).unwrap() as f32;
        let g_sharp_minor = pearson(&rotate(&MINOR_PROFILE, 8), chroma.values()).unwrap() as f32;
        assert_abs_diff_eq!(d_minor, g_sharp_minor, epsilon = 1e-6);
        assert_eq!(estimate_key_from_chroma(&chroma).label(), "D minor");
    }

    #[test]
    fn pearson_of_constant_is_undefined() {
        assert!(pearson(&[1.0, 1.0, 1.0], &[0.0, 1.0, 2.0]).is_none());
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
        assert_abs_diff_eq!(r, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn rotation_moves_tonic() {
        let rotated = rotate(&MAJOR_PROFILE, 3);
        assert_eq!(rotated[3], MAJOR_PROFILE[0]);
        assert_eq!(rotated[2], MAJOR_PROFILE[11]);
    }

    #[test]
    fn empty_clip_is_unknown() {
        let estimator = ToneProfileEstimator::<SpectralFeatures>::default();
        let estimate = estimator
            .estimate_key(&AudioBuffer::silent(44_100).unwrap())
            .unwrap();
        assert_eq!(estimate.label(), "unknown");
    }

    #[test]
    fn c_major_triad_reads_c_major() {
        let sample_rate = 44_100;
        let samples: Vec<f32> = (0..sample_rate as usize * 2)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                [261.63f32, 329.63, 392.0]
                    .iter()
                    .map(|f| (2.0 * PI * f * t).sin() / 3.0)
                    .sum()
            })
            .collect();
        let clip = AudioBuffer::new(samples, sample_rate).unwrap();
        let estimate = ToneProfileEstimator::<SpectralFeatures>::default()
            .estimate_key(&clip)
            .unwrap();
        assert_eq!(estimate.label(), "C major");
    }
}
