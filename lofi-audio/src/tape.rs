//! Tape slow-down
//!
//! The buffer is relabelled with a scaled sample rate, so playback gets
//! slower and deeper together, then converted back to a standard rate. The
//! conversion changes only the data rate, not the pitch or duration shift.

use crate::lofi::EffectError;
use lofi_library::{resample_interleaved, AudioTrack};
use tracing::debug;

/// Sample rate every rendered remix is delivered at
pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;

/// Rate reinterpretation followed by conversion to [`OUTPUT_SAMPLE_RATE`]
#[derive(Debug, Clone, Copy)]
pub struct TapeSlow {
    slow_factor: f64,
}

impl TapeSlow {
    pub fn new(slow_factor: f64) -> Self {
        Self { slow_factor }
    }

    /// Rate the untouched samples are declared at: `round(rate * slow_factor)`
    pub fn reinterpreted_rate(&self, original_rate: u32) -> Result<u32, EffectError> {
        let scaled = (original_rate as f64 * self.slow_factor).round();
        if !scaled.is_finite() || scaled < 1.0 || scaled > u32::MAX as f64 {
            return Err(EffectError::InvalidRate {
                original_rate,
                slow_factor: self.slow_factor,
            });
        }
        Ok(scaled as u32)
    }

    /// Slow the track down and bring it back to [`OUTPUT_SAMPLE_RATE`]
    pub fn apply(&self, track: AudioTrack) -> Result<AudioTrack, EffectError> {
        let new_rate = self.reinterpreted_rate(track.sample_rate)?;
        debug!(
            original_rate = track.sample_rate,
            new_rate,
            slow_factor = self.slow_factor,
            "Reinterpreting sample rate"
        );

        let relabelled = AudioTrack {
            sample_rate: new_rate,
            ..track
        };

        let samples = resample_interleaved(
            &relabelled.samples,
            relabelled.channels,
            relabelled.sample_rate,
            OUTPUT_SAMPLE_RATE,
        )?;

        Ok(AudioTrack::new(samples, OUTPUT_SAMPLE_RATE, relabelled.channels))
    }
}
