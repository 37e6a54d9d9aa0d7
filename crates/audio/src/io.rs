use std::fs::File;
use std::path::Path;

use fretwise_domain::AudioBuffer;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::AudioError;

pub struct AudioDecoder;

impl AudioDecoder {
    /// Decodes the default track of `path` into a mono buffer at its native rate.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<AudioBuffer, AudioError> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref).map_err(|source| AudioError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = path_ref.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|err| AudioError::decode(path_ref, err))?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| AudioError::decode(path_ref, "no default track found"))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| AudioError::decode(path_ref, "track has no sample rate"))?;
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|err| AudioError::decode(path_ref, err))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphError::ResetRequired) => {
                    warn!(
                        path = ?path_ref,
                        decoded = samples.len(),
                        "stream changed mid-file, keeping audio decoded so far"
                    );
                    break;
                }
                Err(err) => return Err(AudioError::decode(path_ref, err)),
            };
            if packet.track_id() != track_id {
                continue;
            }
            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphError::DecodeError(reason)) => {
                    warn!(reason, "skipping undecodable packet");
                    continue;
                }
                Err(err) => return Err(AudioError::decode(path_ref, err)),
            };
            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let mut interleaved = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            interleaved.copy_interleaved_ref(decoded);
            samples.extend(downmix(interleaved.samples(), channels));
        }

        debug!(path = ?path_ref, sample_rate, samples = samples.len(), "decoded audio file");
        Ok(AudioBuffer::new(samples, sample_rate)?)
    }
}

/// Averages interleaved frames down to one channel.
fn downmix(interleaved: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
}
