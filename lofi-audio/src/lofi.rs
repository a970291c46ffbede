//! The lofi effect chain
//!
//! tape slow -> 44.1kHz -> low-pass at 3kHz -> -50dB white noise -> export

use crate::effects::{Effect, LowPassFilter, WhiteNoise};
use crate::export::{export, ExportError};
use crate::tape::TapeSlow;
use lofi_library::{AudioTrack, LoadError, ResampleError, TrackLoader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Slow factor used when nothing better is known
pub const DEFAULT_SLOW_FACTOR: f64 = 0.85;
/// Everything above this is muffled away
pub const LOW_PASS_CUTOFF_HZ: f32 = 3000.0;
/// Level of the noise bed in dBFS
pub const NOISE_VOLUME_DB: f32 = -50.0;

/// Errors raised while rendering a remix
#[derive(Error, Debug)]
pub enum EffectError {
    #[error("Failed to load source audio: {0}")]
    Load(#[from] LoadError),
    #[error(transparent)]
    Resample(#[from] ResampleError),
    #[error("Slow factor {slow_factor} turns {original_rate}Hz into an unusable rate")]
    InvalidRate { original_rate: u32, slow_factor: f64 },
    #[error("Failed to export: {0}")]
    Export(#[from] ExportError),
}

/// Something that can turn a source file into a rendered remix
pub trait LofiRenderer {
    /// Render `input` into `output` with the given slow factor
    fn render(&self, input: &Path, output: &Path, slow_factor: f64) -> Result<(), EffectError>;
}

/// The default effect chain
#[derive(Debug, Clone, Default)]
pub struct LofiProcessor {
    loader: TrackLoader,
}

impl LofiProcessor {
    /// Create a processor that loads sources at their native rate
    pub fn new() -> Self {
        Self {
            loader: TrackLoader::native(),
        }
    }

    /// Run the in-memory part of the chain: slow, filter, add noise
    pub fn apply(&self, track: AudioTrack, slow_factor: f64) -> Result<AudioTrack, EffectError> {
        let mut track = TapeSlow::new(slow_factor).apply(track)?;

        let mut filter = LowPassFilter::new(track.sample_rate, track.channels, LOW_PASS_CUTOFF_HZ);
        debug!(effect = filter.name(), cutoff_hz = filter.cutoff(), "Applying");
        filter.process(&mut track.samples);

        let mut noise = WhiteNoise::new(track.channels, NOISE_VOLUME_DB);
        debug!(effect = noise.name(), volume_db = noise.volume_db(), "Applying");
        noise.process(&mut track.samples);

        Ok(track)
    }
}

impl LofiRenderer for LofiProcessor {
    fn render(&self, input: &Path, output: &Path, slow_factor: f64) -> Result<(), EffectError> {
        let track = self.loader.load(input)?;
        let processed = self.apply(track, slow_factor)?;
        export(&processed, output)?;
        info!("Lofi beat created: {}", output.display());
        Ok(())
    }
}
