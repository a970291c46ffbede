//! Sample rate conversion for interleaved buffers

use rubato::{FftFixedInOut, Resampler};
use thiserror::Error;

/// Frames handed to the resampler per chunk
const CHUNK_FRAMES: usize = 1024;

/// Resampler construction or processing failure
#[derive(Error, Debug)]
#[error("Resample error: {0}")]
pub struct ResampleError(String);

/// Resample interleaved audio from `source_rate` to `target_rate`.
///
/// The output holds exactly `frames * target_rate / source_rate` frames.
pub fn resample_interleaved(
    samples: &[f32],
    channels: u16,
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>, ResampleError> {
    if source_rate == 0 || target_rate == 0 {
        return Err(ResampleError(format!(
            "invalid rate conversion {source_rate} -> {target_rate}"
        )));
    }
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let channels_usize = channels.max(1) as usize;
    let frames = samples.len() / channels_usize;
    let expected_frames =
        (frames as u64 * target_rate as u64 / source_rate as u64) as usize;

    let mut resampler = FftFixedInOut::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        CHUNK_FRAMES,
        channels_usize,
    )
    .map_err(|e| ResampleError(e.to_string()))?;

    // Deinterleave
    let deinterleaved: Vec<Vec<f32>> = (0..channels_usize)
        .map(|ch| {
            (0..frames)
                .map(|f| samples[f * channels_usize + ch])
                .collect()
        })
        .collect();

    let chunk_size = resampler.input_frames_next();
    // Output starts this many frames late; skip it and flush the tail
    let delay = resampler.output_delay();
    let needed = delay + expected_frames;
    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(needed); channels_usize];

    let mut pos = 0;
    while pos < frames || output[0].len() < needed {
        let start = pos.min(frames);
        let end = (pos + chunk_size).min(frames);

        // Input is zero padded up to the fixed chunk size, then past the end
        let padded: Vec<Vec<f32>> = deinterleaved
            .iter()
            .map(|ch| {
                let mut v = ch[start..end].to_vec();
                v.resize(chunk_size, 0.0);
                v
            })
            .collect();

        let resampled = resampler
            .process(&padded, None)
            .map_err(|e| ResampleError(e.to_string()))?;

        for (ch, data) in resampled.into_iter().enumerate() {
            output[ch].extend(data);
        }

        pos += chunk_size;
    }

    // Reinterleave without the delay and the padding tail
    let mut interleaved = Vec::with_capacity(expected_frames * channels_usize);
    for frame_idx in delay..needed {
        for channel in &output {
            interleaved.push(channel[frame_idx]);
        }
    }

    Ok(interleaved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_identity() {
        let samples = vec![0.1, -0.1, 0.2, -0.2];
        let out = resample_interleaved(&samples, 2, 44100, 44100).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn test_output_length_matches_ratio() {
        let samples = vec![0.0f32; 48000 * 2];
        let out = resample_interleaved(&samples, 2, 48000, 44100).unwrap();
        assert_eq!(out.len(), 44100 * 2);
    }

    #[test]
    fn test_upsample_odd_rate() {
        // Slowed-down rates rarely share a large divisor with 44.1kHz
        let samples = vec![0.0f32; 37485];
        let out = resample_interleaved(&samples, 1, 37485, 44100).unwrap();
        assert_eq!(out.len(), 44100);
    }

    #[test]
    fn test_small_divisor_keeps_start_and_end() {
        // 44.1kHz slowed by 80/117 shares only a factor of 2 with 44.1kHz
        let source_rate = 30154;
        let samples = vec![0.5f32; source_rate as usize * 3];
        let out = resample_interleaved(&samples, 1, source_rate, 44100).unwrap();
        assert_eq!(out.len(), 44100 * 3);

        let lead_silent = out.iter().take_while(|s| s.abs() < 0.1).count();
        assert!(lead_silent < 441, "{lead_silent} silent frames at the start");

        let tail = &out[out.len() - 4410..out.len() - 441];
        assert!(tail.iter().all(|s| (s - 0.5).abs() < 0.05));

        let middle = &out[44100..88200];
        assert!(middle.iter().all(|s| (s - 0.5).abs() < 0.01));
    }

    #[test]
    fn test_stereo_channels_stay_aligned() {
        let samples: Vec<f32> = (0..37485).flat_map(|_| [0.5f32, -0.25]).collect();
        let out = resample_interleaved(&samples, 2, 37485, 44100).unwrap();
        assert_eq!(out.len(), 44100 * 2);
        let (left, right) = (out[44100], out[44101]);
        assert!((left - 0.5).abs() < 0.01);
        assert!((right + 0.25).abs() < 0.01);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(resample_interleaved(&[0.0], 1, 0, 44100).is_err());
    }
}
