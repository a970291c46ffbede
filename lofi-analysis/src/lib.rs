//! Audio analysis for LOFI
//!
//! Provides tempo estimation over decoded mono audio.

mod tempo;

pub use tempo::{TempoAnalyzer, TempoEstimate};
