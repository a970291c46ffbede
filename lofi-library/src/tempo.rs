//! Tempo detection for audio files

use crate::loader::{LoadError, TrackLoader};
use lofi_analysis::{TempoAnalyzer, TempoEstimate};
use std::path::Path;
use tracing::info;

/// Rate audio is decoded at before tempo analysis
pub const ANALYSIS_SAMPLE_RATE: u32 = 22050;

/// Anything that can estimate the tempo of an audio file
pub trait TempoDetector {
    /// Estimate the tempo of the file at `path`.
    ///
    /// Load failures are errors; an undetectable tempo is an estimate of `0.0`.
    fn detect(&self, path: &Path) -> Result<TempoEstimate, LoadError>;
}

/// Default detector: decode at [`ANALYSIS_SAMPLE_RATE`], downmix, run [`TempoAnalyzer`]
pub struct BeatTracker {
    loader: TrackLoader,
    analyzer: TempoAnalyzer,
}

impl Default for BeatTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BeatTracker {
    pub fn new() -> Self {
        Self {
            loader: TrackLoader::with_sample_rate(ANALYSIS_SAMPLE_RATE),
            analyzer: TempoAnalyzer::new(ANALYSIS_SAMPLE_RATE),
        }
    }
}

impl TempoDetector for BeatTracker {
    fn detect(&self, path: &Path) -> Result<TempoEstimate, LoadError> {
        let track = self.loader.load(path)?;
        let estimate = self.analyzer.estimate(&track.to_mono());
        info!("Detected BPM: {:.2}", estimate.bpm);
        Ok(estimate)
    }
}
