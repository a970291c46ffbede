//! Tempo estimation using spectral flux onset detection and autocorrelation
//!
//! The analyzer works on mono audio and reports candidate tempos, best first.
//! Callers that need a single number reduce the candidates with
//! [`TempoEstimate::from_candidates`].

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;
use tracing::debug;

/// Lowest tempo the autocorrelation search considers
const MIN_BPM: f32 = 60.0;
/// Highest tempo the autocorrelation search considers
const MAX_BPM: f32 = 200.0;

/// A single tempo value in beats per minute
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TempoEstimate {
    pub bpm: f32,
}

impl TempoEstimate {
    /// Create an estimate from a known value
    pub fn new(bpm: f32) -> Self {
        Self { bpm }
    }

    /// Reduce a candidate list to one value: the first candidate wins.
    ///
    /// An empty list means the estimator found nothing and yields `0.0`.
    pub fn from_candidates(candidates: &[f32]) -> Self {
        Self {
            bpm: candidates.first().copied().unwrap_or(0.0),
        }
    }

    /// Whether the value can be used to derive a slow factor
    pub fn is_usable(&self) -> bool {
        self.bpm.is_finite() && self.bpm > 0.0
    }
}

/// Tempo analyzer working on mono samples
pub struct TempoAnalyzer {
    sample_rate: u32,
    hop_size: usize,
    fft_size: usize,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
}

impl TempoAnalyzer {
    /// Create a new analyzer for the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        let fft_size = 2048;
        let hop_size = 512; // ~23ms at 22.05kHz
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        // Pre-compute Hann window
        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / fft_size as f32).cos()))
            .collect();

        Self {
            sample_rate,
            hop_size,
            fft_size,
            fft,
            window,
        }
    }

    /// Estimate candidate tempos, most likely first.
    ///
    /// Returns an empty list for audio shorter than 4 seconds or without
    /// any periodic onsets.
    pub fn candidates(&self, mono: &[f32]) -> Vec<f32> {
        if mono.len() < self.sample_rate as usize * 4 {
            debug!(
                samples = mono.len(),
                "Audio too short for tempo estimation"
            );
            return Vec::new();
        }

        let onset_function = self.compute_onset_function(mono);
        if onset_function.iter().all(|&v| v == 0.0) {
            return Vec::new();
        }

        let Some((bpm, raw_bpm, confidence)) = self.estimate_bpm_autocorrelation(&onset_function)
        else {
            return Vec::new();
        };

        debug!(bpm, raw_bpm, confidence, "Tempo estimated");

        // The octave the autocorrelation peak actually sat on trails the folded value
        let mut candidates = vec![bpm];
        if raw_bpm != bpm {
            candidates.push(raw_bpm);
        }
        candidates
    }

    /// Estimate a single tempo value
    pub fn estimate(&self, mono: &[f32]) -> TempoEstimate {
        TempoEstimate::from_candidates(&self.candidates(mono))
    }

    /// Compute spectral flux onset detection function
    ///
    /// Spectral flux measures the change in magnitude spectrum between consecutive frames.
    /// Transients (kicks, snares) cause large positive flux values.
    fn compute_onset_function(&self, mono: &[f32]) -> Vec<f32> {
        let mut onset_fn = Vec::new();
        let mut prev_spectrum: Option<Vec<f32>> = None;

        let mut frame_start = 0;
        while frame_start + self.fft_size <= mono.len() {
            let frame = &mono[frame_start..frame_start + self.fft_size];

            let mut buffer: Vec<Complex<f32>> = frame
                .iter()
                .zip(&self.window)
                .map(|(s, w)| Complex::new(s * w, 0.0))
                .collect();

            self.fft.process(&mut buffer);

            let spectrum: Vec<f32> = buffer[..self.fft_size / 2]
                .iter()
                .map(|c| c.norm())
                .collect();

            // Half-wave rectified difference: only increases indicate onsets
            if let Some(ref prev) = prev_spectrum {
                let flux: f32 = spectrum
                    .iter()
                    .zip(prev.iter())
                    .map(|(curr, prev)| (curr - prev).max(0.0))
                    .sum();
                onset_fn.push(flux);
            }

            prev_spectrum = Some(spectrum);
            frame_start += self.hop_size;
        }

        let max = onset_fn.iter().cloned().fold(0.0f32, f32::max);
        if max > 0.0 {
            for v in &mut onset_fn {
                *v /= max;
            }
        }

        onset_fn
    }

    /// Compute normalized correlation at a specific lag
    fn correlation_at_lag(&self, onset_fn: &[f32], lag: usize) -> f32 {
        if lag == 0 || lag >= onset_fn.len() / 2 {
            return 0.0;
        }

        let mut correlation: f32 = 0.0;
        let mut norm_a: f32 = 0.0;
        let mut norm_b: f32 = 0.0;

        for i in 0..(onset_fn.len() - lag) {
            correlation += onset_fn[i] * onset_fn[i + lag];
            norm_a += onset_fn[i] * onset_fn[i];
            norm_b += onset_fn[i + lag] * onset_fn[i + lag];
        }

        let norm = (norm_a * norm_b).sqrt();
        if norm > 0.0 {
            correlation / norm
        } else {
            0.0
        }
    }

    fn frames_per_second(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }

    /// Estimate BPM using autocorrelation of the onset function
    ///
    /// The lag with highest correlation corresponds to the beat period.
    /// Returns `(final_bpm, raw_bpm, confidence)`.
    fn estimate_bpm_autocorrelation(&self, onset_fn: &[f32]) -> Option<(f32, f32, f32)> {
        let frames_per_second = self.frames_per_second();
        let min_lag = ((frames_per_second * 60.0 / MAX_BPM) as usize).max(1);
        let max_lag = (frames_per_second * 60.0 / MIN_BPM).ceil() as usize;

        // Need a few full periods of the slowest tempo
        if onset_fn.len() < max_lag * 3 {
            return None;
        }

        // First ~30 seconds are enough
        let analysis_len = onset_fn.len().min((frames_per_second * 30.0) as usize);
        let analysis = &onset_fn[..analysis_len.max(max_lag * 3)];

        let mut best_lag = 0;
        let mut best_correlation = 0.0f32;

        for lag in min_lag..=max_lag.min(analysis.len() / 2 - 1) {
            let correlation = self.correlation_at_lag(analysis, lag);
            if correlation > best_correlation {
                best_correlation = correlation;
                best_lag = lag;
            }
        }

        if best_lag == 0 {
            return None;
        }

        let raw_bpm = 60.0 * frames_per_second / best_lag as f32;
        let final_bpm = self.disambiguate_octave(analysis, raw_bpm);

        Some((final_bpm, raw_bpm, best_correlation.clamp(0.0, 1.0)))
    }

    /// Disambiguate between octave-related BPM values (e.g., 77 vs 154)
    ///
    /// Very slow or very fast peaks are folded into range. In the ambiguous
    /// ranges the neighbouring octave wins only when its correlation is
    /// comparably strong.
    fn disambiguate_octave(&self, onset_fn: &[f32], raw_bpm: f32) -> f32 {
        let frames_per_second = self.frames_per_second();
        let lag_for = |bpm: f32| (frames_per_second * 60.0 / bpm) as usize;

        if raw_bpm < 65.0 {
            return raw_bpm * 2.0;
        }

        if raw_bpm > 185.0 {
            return raw_bpm / 2.0;
        }

        if (65.0..=95.0).contains(&raw_bpm) {
            let doubled_bpm = raw_bpm * 2.0;
            let original_corr = self.correlation_at_lag(onset_fn, lag_for(raw_bpm));
            let doubled_corr = self.correlation_at_lag(onset_fn, lag_for(doubled_bpm));

            let doubled_is_reasonable = (120.0..=180.0).contains(&doubled_bpm);
            let correlation_ratio = doubled_corr / original_corr.max(0.001);

            if doubled_is_reasonable && correlation_ratio > 0.7 {
                return doubled_bpm;
            }
        }

        if (170.0..=185.0).contains(&raw_bpm) {
            let halved_bpm = raw_bpm / 2.0;
            let original_corr = self.correlation_at_lag(onset_fn, lag_for(raw_bpm));
            let halved_corr = self.correlation_at_lag(onset_fn, lag_for(halved_bpm));

            // Only halve if the halved correlation is significantly stronger
            if halved_corr > original_corr * 1.2 {
                return halved_bpm;
            }
        }

        raw_bpm
    }
}
