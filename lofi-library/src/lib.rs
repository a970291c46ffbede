//! Track handling for LOFI - loading, resampling, tempo detection, config

mod config;
mod loader;
mod resample;
mod tempo;

pub use config::{
    Config, DEFAULT_OUTPUT_DIR, DEFAULT_SEPARATOR_MODEL, DEFAULT_SEPARATOR_PROGRAM,
    DEFAULT_TARGET_BPM,
};
pub use loader::{AudioTrack, LoadError, TrackLoader};
pub use resample::{resample_interleaved, ResampleError};
pub use tempo::{BeatTracker, TempoDetector, ANALYSIS_SAMPLE_RATE};
