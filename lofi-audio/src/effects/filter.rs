//! Biquad low-pass filter

use super::Effect;
use std::f32::consts::PI;

/// Butterworth Q
const BUTTERWORTH_Q: f32 = 0.707;

/// Per-channel delay line
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

/// Biquad low-pass over any number of interleaved channels
pub struct LowPassFilter {
    sample_rate: f32,
    cutoff: f32,
    resonance: f32,

    // Biquad coefficients
    a0: f32,
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,

    states: Vec<BiquadState>,
}

impl LowPassFilter {
    /// Create a low-pass filter for `channels` interleaved channels
    pub fn new(sample_rate: u32, channels: u16, cutoff: f32) -> Self {
        let sample_rate = sample_rate as f32;
        let mut filter = Self {
            sample_rate,
            // Stay below Nyquist or the coefficients blow up
            cutoff: cutoff.clamp(20.0, sample_rate * 0.49),
            resonance: BUTTERWORTH_Q,
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
            b1: 0.0,
            b2: 0.0,
            states: vec![BiquadState::default(); channels.max(1) as usize],
        };
        filter.calculate_coefficients();
        filter
    }

    /// Get cutoff frequency
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Calculate biquad coefficients based on current parameters
    fn calculate_coefficients(&mut self) {
        let omega = 2.0 * PI * self.cutoff / self.sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * self.resonance);

        let b0 = (1.0 - cos_omega) / 2.0;
        let b1 = 1.0 - cos_omega;
        let b2 = (1.0 - cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        self.a0 = b0 / a0;
        self.a1 = b1 / a0;
        self.a2 = b2 / a0;
        self.b1 = a1 / a0;
        self.b2 = a2 / a0;
    }

    #[inline]
    fn process_sample(&mut self, input: f32, channel: usize) -> f32 {
        let s = &mut self.states[channel];

        let output =
            self.a0 * input + self.a1 * s.x1 + self.a2 * s.x2 - self.b1 * s.y1 - self.b2 * s.y2;

        s.x2 = s.x1;
        s.x1 = input;
        s.y2 = s.y1;
        s.y1 = output;

        output
    }
}

impl Effect for LowPassFilter {
    fn process(&mut self, samples: &mut [f32]) {
        let channels = self.states.len();
        for frame in samples.chunks_exact_mut(channels) {
            for (channel, sample) in frame.iter_mut().enumerate() {
                *sample = self.process_sample(*sample, channel);
            }
        }
    }

    fn name(&self) -> &'static str {
        "LP Filter"
    }
}
