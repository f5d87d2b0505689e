use std::io::Cursor;
use std::path::Path;

use log::{debug, warn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{DecodeError, PlayerError};

/// Fully decoded audio, one planar sample vector per channel
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Take channel 0, the channel the waveform is drawn from
    pub fn into_first_channel(self) -> Vec<f32> {
        self.channels.into_iter().next().unwrap_or_default()
    }
}

/// Converts compressed audio bytes into raw channel samples
pub trait AudioDecodeBackend: Send + Sync {
    /// Decode a whole stream. `extension` is a format hint such as `"flac"`.
    fn decode(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio, DecodeError>;

    /// Read and decode a file
    fn decode_file(&self, path: &Path) -> Result<DecodedAudio, PlayerError> {
        let bytes = std::fs::read(path)?;
        let extension = path.extension().and_then(|ext| ext.to_str());
        Ok(self.decode(bytes, extension)?)
    }
}

/// Decode backend built on symphonia's format probe and codec registry
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecodeBackend for SymphoniaDecoder {
    fn decode(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio, DecodeError> {
        let media_source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = extension {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, media_source, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| DecodeError::UnsupportedFormat {
                format: match extension {
                    Some(ext) => format!("{} ({})", ext, e),
                    None => e.to_string(),
                },
            })?;

        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
        let channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::UnsupportedFormat {
                format: format!("no decoder for track: {}", e),
            })?;

        let mut channels: Vec<Vec<f32>> = vec![Vec::new(); channel_count];
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref err))
                    if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(err) => {
                    return Err(DecodeError::DecodeFailed(format!("Failed to read packet: {}", err)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    // Corrupt packet; skip it and keep going
                    warn!("Skipping undecodable packet: {}", msg);
                    continue;
                }
                Err(err) => {
                    return Err(DecodeError::DecodeFailed(err.to_string()));
                }
            };

            let spec = *decoded.spec();
            let frames = decoded.frames();
            if frames == 0 {
                continue;
            }
            if sample_rate == 0 {
                sample_rate = spec.rate;
            }
            if channels.len() < spec.channels.count() {
                channels.resize(spec.channels.count(), Vec::new());
            }

            let needs_new_buffer = sample_buf
                .as_ref()
                .map(|buf| buf.capacity() < frames * spec.channels.count())
                .unwrap_or(true);
            if needs_new_buffer {
                sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
            }

            if let Some(buf) = sample_buf.as_mut() {
                buf.copy_planar_ref(decoded);
                // Planar layout: channel c occupies [c * frames, (c + 1) * frames)
                for (channel, plane) in channels.iter_mut().zip(buf.samples().chunks_exact(frames)) {
                    channel.extend_from_slice(plane);
                }
            }
        }

        if channels.iter().all(Vec::is_empty) {
            return Err(DecodeError::DecodeFailed("stream contained no audio frames".to_string()));
        }

        debug!(
            "Decoded {} channel(s), {} frames at {} Hz",
            channels.len(),
            channels.first().map(Vec::len).unwrap_or(0),
            sample_rate
        );

        Ok(DecodedAudio::new(channels, sample_rate))
    }
}
