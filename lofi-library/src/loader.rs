//! Audio file loading and decoding

use crate::resample::{resample_interleaved, ResampleError};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during track loading
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The file exists but is not a recognized audio container
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("No audio track found in file")]
    NoAudioTrack,
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("No audio samples decoded")]
    Empty,
    #[error(transparent)]
    Resample(#[from] ResampleError),
}

/// A decoded audio buffer
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    /// Interleaved samples (f32, normalized to -1.0 to 1.0)
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
}

impl AudioTrack {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Duration at the declared sample rate
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Average all channels into a single one
    pub fn to_mono(&self) -> Vec<f32> {
        let channels = self.channels.max(1) as usize;
        if channels == 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }
}

/// Audio file loader using Symphonia
#[derive(Debug, Clone, Default)]
pub struct TrackLoader {
    /// Resample to this rate after decoding; `None` keeps the file's rate
    target_sample_rate: Option<u32>,
}

impl TrackLoader {
    /// Create a loader that keeps the file's native sample rate
    pub fn native() -> Self {
        Self {
            target_sample_rate: None,
        }
    }

    /// Create a loader that resamples everything to `target_sample_rate`
    pub fn with_sample_rate(target_sample_rate: u32) -> Self {
        Self {
            target_sample_rate: Some(target_sample_rate),
        }
    }

    /// Load and decode an audio file
    pub fn load(&self, path: &Path) -> Result<AudioTrack, LoadError> {
        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create hint from file extension
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            // The file opened fine, so any probe failure means it isn't audio we can read
            .map_err(|e| LoadError::UnsupportedFormat(e.to_string()))?;

        let mut format = probed.format;

        // Find first audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(LoadError::NoAudioTrack)?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Decode(e.to_string()))?;

        let mut sample_rate = codec_params.sample_rate.unwrap_or(44100);
        let mut channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(msg)) => {
                    // Corrupt frames are skipped, the rest of the stream is still usable
                    warn!("Skipping undecodable packet in {}: {}", path.display(), msg);
                    continue;
                }
                Err(e) => return Err(LoadError::Decode(e.to_string())),
            };

            // The decoded spec is authoritative over container headers
            let spec = *decoded.spec();
            sample_rate = spec.rate;
            channels = spec.channels.count() as u16;

            let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(sample_buf.samples());
        }

        if samples.is_empty() {
            return Err(LoadError::Empty);
        }

        debug!(
            path = %path.display(),
            sample_rate,
            channels,
            frames = samples.len() / channels.max(1) as usize,
            "Decoded audio"
        );

        let track = match self.target_sample_rate {
            Some(target) if target != sample_rate => AudioTrack::new(
                resample_interleaved(&samples, channels, sample_rate, target)?,
                target,
                channels,
            ),
            _ => AudioTrack::new(samples, sample_rate, channels),
        };

        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_sine(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        let frames = (sample_rate as f32 * seconds) as usize;
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let s = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            for _ in 0..channels {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_native_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine(&path, 44100, 2, 1.0);

        let track = TrackLoader::native().load(&path).unwrap();
        assert_eq!(track.sample_rate, 44100);
        assert_eq!(track.channels, 2);
        assert_eq!(track.frames(), 44100);
        assert!((track.duration_secs() - 1.0).abs() < 1e-6);
        assert!(track.samples.iter().any(|&s| s.abs() > 0.4));
    }

    #[test]
    fn test_load_resampled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine(&path, 44100, 1, 2.0);

        let track = TrackLoader::with_sample_rate(22050).load(&path).unwrap();
        assert_eq!(track.sample_rate, 22050);
        assert_eq!(track.channels, 1);
        assert_eq!(track.frames(), 44100);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = TrackLoader::native().load(&dir.path().join("missing.wav"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn test_non_audio_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.mp3");
        std::fs::write(&path, b"these are not the samples you are looking for").unwrap();

        let result = TrackLoader::native().load(&path);
        assert!(
            matches!(result, Err(LoadError::UnsupportedFormat(_))),
            "unexpected result: {result:?}"
        );
    }

    #[test]
    fn test_to_mono_averages_channels() {
        let track = AudioTrack::new(vec![1.0, 0.0, 0.5, 0.5], 44100, 2);
        assert_eq!(track.to_mono(), vec![0.5, 0.5]);
        assert_eq!(track.frames(), 2);
    }
}
