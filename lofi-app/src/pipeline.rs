//! Song to lofi remix pipeline
//!
//! Three steps run in order, each blocking until done:
//! 1. find the instrumental (separate vocals unless the input already is one)
//! 2. pick the slow factor (given, or derived from detected tempo)
//! 3. render the effect chain into `<song>_lofi_remix.mp3`
//!
//! Any step failing aborts the run; there are no retries.

use lofi_analysis::TempoEstimate;
use lofi_audio::{EffectError, LofiRenderer, DEFAULT_SLOW_FACTOR};
use lofi_library::{LoadError, TempoDetector, DEFAULT_TARGET_BPM};
use lofi_stems::{song_base_name, SeparationError, StemSeparator};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Appended to the song's base name to form the output file
pub const REMIX_SUFFIX: &str = "_lofi_remix.mp3";

/// File names containing this are treated as already separated
const ACCOMPANIMENT_MARKER: &str = "accompaniment";

/// Errors that abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Vocal separation failed: {0}")]
    Separation(#[from] SeparationError),
    #[error("Tempo detection failed: {0}")]
    TempoDetection(#[from] LoadError),
    #[error("Applying lofi effects failed: {0}")]
    Effects(#[from] EffectError),
}

/// Inputs for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    /// Explicit slow factor; skips tempo detection
    pub slow_factor: Option<f64>,
    /// Tempo the remix is slowed towards when no slow factor is given
    pub target_bpm: u32,
    /// The input is already an instrumental; skips separation
    pub instrumental: bool,
}

impl PipelineConfig {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            slow_factor: None,
            target_bpm: DEFAULT_TARGET_BPM,
            instrumental: false,
        }
    }
}

/// Whether the input can skip vocal separation
///
/// The explicit flag wins; otherwise stems written by a previous run are
/// recognized by their file name.
// Only the file name is matched. Directories named after the marker do not
// count, unlike a check over the whole path string.
pub fn is_instrumental(path: &Path, flagged: bool) -> bool {
    flagged
        || path
            .file_name()
            .map(|name| name.to_string_lossy().contains(ACCOMPANIMENT_MARKER))
            .unwrap_or(false)
}

/// `<input_basename>_lofi_remix.mp3` in the working directory
pub fn output_path_for(input: &Path) -> PathBuf {
    PathBuf::from(format!("{}{}", song_base_name(input), REMIX_SUFFIX))
}

/// Slow factor that moves `estimate` onto `target_bpm`, or the fallback
/// when the estimate is unusable
pub fn slow_factor_from_tempo(target_bpm: u32, estimate: TempoEstimate) -> f64 {
    if estimate.is_usable() {
        target_bpm as f64 / estimate.bpm as f64
    } else {
        DEFAULT_SLOW_FACTOR
    }
}

/// The pipeline, wired to its three stages
pub struct Pipeline<'a> {
    separator: &'a dyn StemSeparator,
    tempo: &'a dyn TempoDetector,
    renderer: &'a dyn LofiRenderer,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        separator: &'a dyn StemSeparator,
        tempo: &'a dyn TempoDetector,
        renderer: &'a dyn LofiRenderer,
    ) -> Self {
        Self {
            separator,
            tempo,
            renderer,
        }
    }

    /// Run the whole conversion and return the written file
    pub fn run(&self, config: &PipelineConfig) -> Result<PathBuf, PipelineError> {
        let instrumental = self.instrumental_source(config)?;
        let slow_factor = self.resolve_slow_factor(config, &instrumental)?;

        info!("Applying Lofi effects...");
        let output = output_path_for(&config.input_path);
        self.renderer.render(&instrumental, &output, slow_factor)?;

        Ok(output)
    }

    fn instrumental_source(&self, config: &PipelineConfig) -> Result<PathBuf, PipelineError> {
        if is_instrumental(&config.input_path, config.instrumental) {
            info!("Input appears to be an instrumental already. Skipping vocal separation.");
            return Ok(config.input_path.clone());
        }

        info!("Separating vocals with {}... (This might take a moment)", self.separator.name());
        let stems = self.separator.separate(&config.input_path)?;
        Ok(stems.instrumental_path)
    }

    fn resolve_slow_factor(
        &self,
        config: &PipelineConfig,
        instrumental: &Path,
    ) -> Result<f64, PipelineError> {
        match config.slow_factor {
            Some(factor) if factor.is_finite() && factor > 0.0 => {
                info!("Using provided slow factor: {}", factor);
                Ok(factor)
            }
            Some(factor) => {
                warn!(
                    "Slow factor {} is not a positive number, using default {}",
                    factor, DEFAULT_SLOW_FACTOR
                );
                Ok(DEFAULT_SLOW_FACTOR)
            }
            None => {
                info!("Detecting BPM to calculate slowdown...");
                let estimate = self.tempo.detect(instrumental)?;
                let factor = slow_factor_from_tempo(config.target_bpm, estimate);
                if estimate.is_usable() {
                    info!(
                        "Calculated slow factor for target BPM of {}: {:.2}",
                        config.target_bpm, factor
                    );
                } else {
                    warn!("Could not detect BPM, using default slow factor.");
                }
                Ok(factor)
            }
        }
    }
}
