use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use fretwise_domain::{AudioBuffer, DomainError};
use ringbuf::{HeapConsumer, HeapProducer, HeapRb};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::AudioError;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// Length of one captured frame in seconds.
    pub duration_secs: f32,
    pub sample_rate: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            duration_secs: 0.5,
            sample_rate: 44_100,
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.sample_rate == 0 {
            return Err(DomainError::validation("sample rate must be positive"));
        }
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(DomainError::validation(
                "capture duration must be a positive number of seconds",
            ));
        }
        Ok(())
    }

    /// Number of mono samples in one frame.
    pub fn frame_len(&self) -> usize {
        (self.duration_secs as f64 * self.sample_rate as f64) as usize
    }

    /// Longest a capture may block before the device is considered stalled.
    pub fn deadline(&self) -> Duration {
        Duration::from_secs_f32(self.duration_secs * 4.0) + Duration::from_secs(1)
    }
}

/// A blocking source of fixed-length mono frames.
pub trait CaptureSource {
    /// Blocks until one fresh frame of `config.frame_len()` samples is available.
    fn capture(&mut self, config: &CaptureConfig) -> Result<AudioBuffer, AudioError>;

    /// Stops the underlying device. Further captures fail.
    fn release(&mut self) {}
}

/// Default input device, opened through cpal and downmixed to mono.
pub struct CpalCapture {
    device_name: String,
    sample_rate: u32,
    stream: Option<cpal::Stream>,
    consumer: HeapConsumer<f32>,
}

impl CpalCapture {
    pub fn open_default(config: &CaptureConfig) -> Result<Self, AudioError> {
        config.validate()?;
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no default input device".into()))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let supported = device
            .default_input_config()
            .map_err(|err| AudioError::DeviceUnavailable(err.to_string()))?;
        let channels = supported.channels();
        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let capacity = config.frame_len() * 2 + config.sample_rate as usize;
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                build_mono_stream::<f32>(&device, &stream_config, producer, |s| s)
            }
            cpal::SampleFormat::I16 => {
                build_mono_stream::<i16>(&device, &stream_config, producer, |s| {
                    s as f32 / i16::MAX as f32
                })
            }
            cpal::SampleFormat::U16 => {
                build_mono_stream::<u16>(&device, &stream_config, producer, |s| {
                    (s as f32 / u16::MAX as f32) * 2.0 - 1.0
                })
            }
            other => Err(AudioError::DeviceUnavailable(format!(
                "unsupported input sample format {other:?}"
            ))),
        }?;
        // Some hosts start streams on creation; frames are only collected on demand.
        if let Err(err) = stream.pause() {
            debug!(%err, "input stream cannot be paused between captures");
        }

        info!(device = %device_name, channels, sample_rate = config.sample_rate, "opened input device");
        Ok(Self {
            device_name,
            sample_rate: config.sample_rate,
            stream: Some(stream),
            consumer,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl CaptureSource for CpalCapture {
    fn capture(&mut self, config: &CaptureConfig) -> Result<AudioBuffer, AudioError> {
        config.validate()?;
        if config.sample_rate != self.sample_rate {
            return Err(DomainError::validation(format!(
                "device opened at {} Hz, capture requested {} Hz",
                self.sample_rate, config.sample_rate
            ))
            .into());
        }
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| AudioError::DeviceUnavailable("input device released".into()))?;

        // Drop anything left over from before this frame was requested.
        self.consumer.clear();
        stream
            .play()
            .map_err(|err| AudioError::DeviceUnavailable(err.to_string()))?;

        let expected = config.frame_len();
        let mut samples = vec![0.0f32; expected];
        let mut filled = 0;
        let started = Instant::now();
        let deadline = config.deadline();
        while filled < expected {
            filled += self.consumer.pop_slice(&mut samples[filled..]);
            if filled >= expected {
                break;
            }
            if started.elapsed() > deadline {
                let _ = stream.pause();
                return Err(AudioError::CaptureTimeout {
                    expected,
                    captured: filled,
                    waited: started.elapsed(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
        if let Err(err) = stream.pause() {
            debug!(%err, "input stream kept running after capture");
        }

        debug!(samples = expected, elapsed = ?started.elapsed(), "captured frame");
        Ok(AudioBuffer::new(samples, self.sample_rate)?)
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            info!(device = %self.device_name, "released input device");
        }
    }
}

fn build_mono_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut producer: HeapProducer<f32>,
    convert: fn(T) -> f32,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + 'static,
{
    let channels = config.channels.max(1) as usize;
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks(channels) {
                    let mono = frame.iter().map(|s| convert(*s)).sum::<f32>() / frame.len() as f32;
                    // A full ring means nobody is capturing; the sample is stale anyway.
                    let _ = producer.push(mono);
                }
            },
            |err| warn!(%err, "input stream error"),
            None,
        )
        .map_err(|err| AudioError::DeviceUnavailable(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_cli_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.frame_len(), 22_050);
        assert!(config.validate().is_ok());
        assert!(config.deadline() > Duration::from_secs_f32(config.duration_secs));
    }

    #[test]
    fn config_validation() {
        let zero_rate = CaptureConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(zero_rate.validate().is_err());
        let negative = CaptureConfig {
            duration_secs: -0.5,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
        let nan = CaptureConfig {
            duration_secs: f32::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }
}
