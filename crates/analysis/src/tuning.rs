use fretwise_domain::{TuningDirection, TuningResult, TuningTarget, STANDARD_TUNING};

/// Deviations within this many Hz of the target count as in tune.
pub const IN_TUNE_TOLERANCE_HZ: f32 = 1.0;

#[derive(Clone, Copy, Debug)]
pub struct TuningMapper {
    targets: &'static [TuningTarget],
}

impl Default for TuningMapper {
    fn default() -> Self {
        Self {
            targets: &STANDARD_TUNING,
        }
    }
}

impl TuningMapper {
    /// Nearest target to `frequency`; the earlier table entry wins a tie.
    pub fn map_to_target(&self, frequency: f32) -> TuningResult {
        let mut nearest = self.targets[0];
        for target in &self.targets[1..] {
            if (target.frequency - frequency).abs() < (nearest.frequency - frequency).abs() {
                nearest = *target;
            }
        }
        let deviation = frequency - nearest.frequency;
        let direction = if deviation > IN_TUNE_TOLERANCE_HZ {
            TuningDirection::Sharp
        } else if deviation < -IN_TUNE_TOLERANCE_HZ {
            TuningDirection::Flat
        } else {
            TuningDirection::InTune
        };
        TuningResult {
            note: nearest.note,
            target: nearest.frequency,
            frequency,
            deviation,
            direction,
        }
    }
}

pub fn map_to_target(frequency: f32) -> TuningResult {
    TuningMapper::default().map_to_target(frequency)
}
