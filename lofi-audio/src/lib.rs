//! Effect chain for LOFI
//!
//! This crate turns a decoded track into a lofi remix:
//! - Tape: sample rate reinterpretation for the slow, deep playback
//! - Effects: biquad low-pass and white noise overlay
//! - Export: MP3 (LAME) and WAV (hound) writers

mod effects;
mod export;
mod lofi;
mod tape;

pub use effects::{db_to_gain, Effect, LowPassFilter, WhiteNoise};
pub use export::{export, ExportError, ExportFormat};
pub use lofi::{
    EffectError, LofiProcessor, LofiRenderer, DEFAULT_SLOW_FACTOR, LOW_PASS_CUTOFF_HZ,
    NOISE_VOLUME_DB,
};
pub use tape::{TapeSlow, OUTPUT_SAMPLE_RATE};
