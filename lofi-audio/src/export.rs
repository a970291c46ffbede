//! Writing rendered tracks to disk

use hound::{SampleFormat, WavSpec, WavWriter};
use lofi_library::AudioTrack;
use mp3lame_encoder::{
    max_required_buffer_size, Bitrate, Builder, FlushNoGap, InterleavedPcm, MonoPcm, Quality,
};
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Frames handed to LAME per call
const ENCODE_CHUNK_FRAMES: usize = 8192;

/// Errors that can occur while exporting
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),
    #[error("Encoder error: {0}")]
    Encoder(String),
}

fn encoder_error(e: impl Debug) -> ExportError {
    ExportError::Encoder(format!("{e:?}"))
}

fn wav_error(e: hound::Error) -> ExportError {
    match e {
        hound::Error::IoError(e) => ExportError::Io(e),
        other => encoder_error(other),
    }
}

/// Container chosen from the destination extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// MPEG-1 Layer III via LAME
    Mp3,
    /// 32-bit float WAV
    Wav,
}

impl ExportFormat {
    /// Pick the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            _ => Err(ExportError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Write `track` to `path`, replacing any existing file
pub fn export(track: &AudioTrack, path: &Path) -> Result<(), ExportError> {
    let format = ExportFormat::from_path(path)?;
    debug!(path = %path.display(), ?format, frames = track.frames(), "Exporting");

    match format {
        ExportFormat::Mp3 => export_mp3(track, path),
        ExportFormat::Wav => export_wav(track, path),
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn export_mp3(track: &AudioTrack, path: &Path) -> Result<(), ExportError> {
    let source_channels = track.channels.max(1) as usize;
    // LAME takes mono or stereo; wider layouts keep their first two channels
    let channels: usize = if source_channels == 1 { 1 } else { 2 };

    let pcm: Vec<i16> = track
        .samples
        .chunks_exact(source_channels)
        .flat_map(|frame| frame[..channels].iter().map(|&s| to_i16(s)))
        .collect();

    let mut builder = Builder::new()
        .ok_or_else(|| ExportError::Encoder("failed to allocate LAME encoder".to_string()))?;
    builder.set_num_channels(channels as u8).map_err(encoder_error)?;
    builder.set_sample_rate(track.sample_rate).map_err(encoder_error)?;
    builder.set_brate(Bitrate::Kbps192).map_err(encoder_error)?;
    builder.set_quality(Quality::Best).map_err(encoder_error)?;
    let mut encoder = builder.build().map_err(encoder_error)?;

    let mut mp3 = Vec::new();
    for chunk in pcm.chunks(ENCODE_CHUNK_FRAMES * channels) {
        mp3.reserve(max_required_buffer_size(chunk.len() / channels));
        let encoded = if channels == 1 {
            encoder.encode_to_vec(MonoPcm(chunk), &mut mp3)
        } else {
            encoder.encode_to_vec(InterleavedPcm(chunk), &mut mp3)
        };
        encoded.map_err(encoder_error)?;
    }

    mp3.reserve(max_required_buffer_size(0));
    encoder
        .flush_to_vec::<FlushNoGap>(&mut mp3)
        .map_err(encoder_error)?;

    fs::write(path, mp3)?;
    Ok(())
}

fn export_wav(track: &AudioTrack, path: &Path) -> Result<(), ExportError> {
    let spec = WavSpec {
        channels: track.channels,
        sample_rate: track.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec).map_err(wav_error)?;
    for &sample in &track.samples {
        writer.write_sample(sample).map_err(wav_error)?;
    }
    writer.finalize().map_err(wav_error)?;
    Ok(())
}
