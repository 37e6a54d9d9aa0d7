use anyhow::{Context, Result};
use fretwise_analysis::{SpectralEstimator, TuningMapper};
use fretwise_audio::{CaptureConfig, CaptureSource};
use fretwise_domain::{AudioBuffer, TuningResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::CancelToken;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Capturing,
    Estimating,
    Displaying,
    Cancelled,
}

/// Receives one reading per completed cycle.
pub trait TuningDisplay {
    fn show(&mut self, result: &TuningResult);
}

impl<F: FnMut(&TuningResult)> TuningDisplay for F {
    fn show(&mut self, result: &TuningResult) {
        self(result)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoopSummary {
    pub cycles: u64,
}

/// Capture, estimate, display, repeat, until the token is cancelled.
///
/// Each [`step`](Self::step) performs one transition. The token is checked
/// before every transition, so cancellation never interrupts a capture or a
/// transform half way. Frames are consumed by the estimate that follows
/// them and never carried into the next cycle.
pub struct TuningLoop<C: CaptureSource> {
    source: C,
    config: CaptureConfig,
    cancel: CancelToken,
    estimator: SpectralEstimator,
    mapper: TuningMapper,
    state: LoopState,
    frame: Option<AudioBuffer>,
    reading: Option<TuningResult>,
    cycles: u64,
}

impl<C: CaptureSource> TuningLoop<C> {
    pub fn new(source: C, config: CaptureConfig, cancel: CancelToken) -> Result<Self> {
        config.validate().context("invalid capture configuration")?;
        Ok(Self {
            source,
            config,
            cancel,
            estimator: SpectralEstimator,
            mapper: TuningMapper::default(),
            state: LoopState::Idle,
            frame: None,
            reading: None,
            cycles: 0,
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Completed capture-to-display cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn step<D: TuningDisplay + ?Sized>(&mut self, display: &mut D) -> Result<LoopState> {
        if self.state == LoopState::Cancelled {
            return Ok(self.state);
        }
        if self.cancel.is_cancelled() {
            info!(from = ?self.state, cycles = self.cycles, "tuning loop cancelled");
            self.shut_down();
            return Ok(self.state);
        }

        self.state = match self.state {
            LoopState::Idle => LoopState::Capturing,
            LoopState::Capturing => match self.source.capture(&self.config) {
                Ok(frame) => {
                    self.frame = Some(frame);
                    LoopState::Estimating
                }
                Err(err) => {
                    warn!(%err, "capture failed, stopping tuning loop");
                    self.shut_down();
                    return Err(err).context("capture audio frame");
                }
            },
            LoopState::Estimating => {
                let frame = self.frame.take();
                let frequency = frame
                    .as_ref()
                    .map(|frame| self.estimator.estimate(frame))
                    .unwrap_or(0.0);
                let result = self.mapper.map_to_target(frequency);
                debug!(frequency, note = result.note, direction = %result.direction, "estimated pitch");
                self.reading = Some(result);
                LoopState::Displaying
            }
            LoopState::Displaying => {
                if let Some(result) = self.reading.take() {
                    display.show(&result);
                }
                self.cycles += 1;
                LoopState::Capturing
            }
            LoopState::Cancelled => LoopState::Cancelled,
        };
        Ok(self.state)
    }

    /// Steps until cancelled. The capture source is released on every exit.
    pub fn run<D: TuningDisplay + ?Sized>(mut self, display: &mut D) -> Result<LoopSummary> {
        info!(
            duration_secs = self.config.duration_secs,
            sample_rate = self.config.sample_rate,
            "starting tuning loop"
        );
        while self.step(display)? != LoopState::Cancelled {}
        Ok(LoopSummary {
            cycles: self.cycles,
        })
    }

    fn shut_down(&mut self) {
        self.frame = None;
        self.reading = None;
        self.source.release();
        self.state = LoopState::Cancelled;
    }
}
