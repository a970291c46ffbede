//! White noise overlay
//!
//! Adds a constant low-level hiss on top of the track. The same noise sample
//! goes to every channel of a frame, like a mono noise bed mixed under the music.

use super::Effect;

/// Convert decibels relative to full scale into a linear gain
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Seeded white noise generator mixed additively into a buffer
pub struct WhiteNoise {
    channels: usize,
    volume_db: f32,
    gain: f32,
    // PRNG state (deterministic, no allocation)
    random_state: u64,
}

impl WhiteNoise {
    const DEFAULT_SEED: u64 = 0xDEADBEEF_CAFEBABE;

    /// Create a noise overlay at `volume_db` dBFS for interleaved audio
    pub fn new(channels: u16, volume_db: f32) -> Self {
        Self::with_seed(channels, volume_db, Self::DEFAULT_SEED)
    }

    /// Same as [`WhiteNoise::new`] with an explicit PRNG seed
    pub fn with_seed(channels: u16, volume_db: f32, seed: u64) -> Self {
        // xorshift gets stuck on zero
        let seed = if seed == 0 { Self::DEFAULT_SEED } else { seed };
        Self {
            channels: channels.max(1) as usize,
            volume_db,
            gain: db_to_gain(volume_db),
            random_state: seed,
        }
    }

    /// Noise level in dBFS
    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    /// Peak linear amplitude of the generated noise
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// xorshift64 PRNG
    #[inline]
    fn next_random(&mut self) -> f32 {
        self.random_state ^= self.random_state << 13;
        self.random_state ^= self.random_state >> 7;
        self.random_state ^= self.random_state << 17;
        (self.random_state as f32) / (u64::MAX as f32)
    }

    /// Next noise sample in [-gain, gain]
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        (self.next_random() * 2.0 - 1.0) * self.gain
    }
}

impl Effect for WhiteNoise {
    fn process(&mut self, samples: &mut [f32]) {
        for frame in samples.chunks_mut(self.channels) {
            let noise = self.next_sample();
            for sample in frame {
                *sample += noise;
            }
        }
    }

    fn name(&self) -> &'static str {
        "White Noise"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_gain() {
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_gain(-20.0) - 0.1).abs() < 1e-6);
        assert!((db_to_gain(-50.0) - 0.003_162_3).abs() < 1e-6);
    }

    #[test]
    fn test_noise_stays_within_level() {
        let mut noise = WhiteNoise::new(1, -50.0);
        let limit = noise.gain() * 1.0001;
        for _ in 0..10_000 {
            assert!(noise.next_sample().abs() <= limit);
        }
    }

    #[test]
    fn test_noise_centered_with_variation() {
        let mut noise = WhiteNoise::new(1, 0.0);
        let samples: Vec<f32> = (0..10_000).map(|_| noise.next_sample()).collect();

        let mean: f32 = samples.iter().sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 0.05);

        let variance: f32 =
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / samples.len() as f32;
        // Uniform on [-1, 1] has variance 1/3
        assert!((variance - 1.0 / 3.0).abs() < 0.05);
    }

    #[test]
    fn test_overlay_identical_across_channels() {
        let mut noise = WhiteNoise::new(2, -50.0);
        let mut samples = vec![0.25f32; 200];
        noise.process(&mut samples);

        for frame in samples.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert!(samples.iter().any(|&s| s != 0.25));
    }

    #[test]
    fn test_same_seed_repeats_sequence() {
        let mut a = WhiteNoise::with_seed(1, -50.0, 42);
        let mut b = WhiteNoise::with_seed(1, -50.0, 42);
        let first: Vec<f32> = (0..16).map(|_| a.next_sample()).collect();
        let second: Vec<f32> = (0..16).map(|_| b.next_sample()).collect();
        assert_eq!(first, second);
    }
}
