//! Offline audio effects for LOFI

mod filter;
mod noise;

pub use filter::LowPassFilter;
pub use noise::{db_to_gain, WhiteNoise};

/// Trait for audio effects
pub trait Effect {
    /// Process interleaved samples in place
    fn process(&mut self, samples: &mut [f32]);

    /// Get effect name
    fn name(&self) -> &'static str;
}
