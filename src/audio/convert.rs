//! Format conversion from native capture buffers to the canonical format.
//!
//! Both the energy detector and the recognition engine expect mono f32 at
//! the canonical sample rate. Capture devices deliver whatever they want —
//! stereo at 44.1kHz, mono at 48kHz — so every buffer passes through here
//! first, on the capture callback thread.

use crate::audio::frame::{AudioFrame, NativeFormat, Source};

/// Converts a native capture buffer into a canonical [`AudioFrame`].
///
/// Multi-channel input is downmixed by averaging; rate mismatches are
/// resolved by linear-interpolation resampling. The identity case (already
/// mono at the target rate) copies the buffer without a resample pass.
///
/// Returns `None` when the buffer cannot be converted (degenerate format);
/// the frame is simply dropped, with no escalation.
pub fn convert_frame(
    samples: &[f32],
    format: NativeFormat,
    source: Source,
    target_rate: u32,
) -> Option<AudioFrame> {
    if format.channels == 0 || format.sample_rate == 0 || target_rate == 0 {
        return None;
    }

    // Identity case: already canonical
    if format.channels == 1 && format.sample_rate == target_rate {
        return Some(AudioFrame::new(source, samples.to_vec()));
    }

    let mono = downmix(samples, format.channels as usize);
    let resampled = resample(&mono, format.sample_rate, target_rate);
    Some(AudioFrame::new(source, resampled))
}

/// Mix interleaved multi-channel audio to mono by averaging channels.
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampling between arbitrary rates.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}
