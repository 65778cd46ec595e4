//! Energy detection for speaker arbitration.
//!
//! A single pure function: the root-mean-square level of a buffer. The
//! arbiter compares per-source RMS values against a threshold to decide who
//! is speaking.

/// Calculates the Root Mean Square (RMS) of normalized audio samples.
///
/// # Arguments
/// * `samples` - Mono f32 samples in [-1.0, 1.0]
///
/// # Returns
/// Non-negative RMS value, where:
/// - 0.0 represents silence
/// - ~0.707 represents a full-scale sine wave
/// - 1.0 represents maximum amplitude
///
/// Zero-length input returns 0.0 rather than failing.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let s = sample as f64;
            s * s
        })
        .sum();

    let mean_square = sum_squares / samples.len() as f64;
    mean_square.sqrt() as f32
}
