//! Default configuration constants for crosstalk.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Canonical audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications. Every
/// capture buffer is converted to this rate before energy detection and
/// recognition append.
pub const SAMPLE_RATE: u32 = 16000;

/// Default arbitration energy threshold.
///
/// RMS level (0.0 to 1.0) above which a source counts as "speaking". An
/// empirical constant — real deployments should calibrate it per hardware,
/// which is why it is configuration rather than a hard invariant.
pub const ENERGY_THRESHOLD: f32 = 0.01;

/// Default hold time between active-source switches, in milliseconds.
///
/// Once the arbiter commits a switch, further switches are suppressed for
/// this long. Prevents rapid oscillation when both participants speak over
/// each other briefly.
pub const HOLD_MS: u64 = 1000;

/// Default silence timeout in milliseconds before a partial is committed.
///
/// If the recognizer stops updating the partial text for this long, the
/// utterance is considered finished and committed.
pub const SILENCE_TIMEOUT_MS: u64 = 1200;

/// Default maximum utterance duration in milliseconds.
///
/// Caps runaway utterances (a long monologue keeps the partial changing and
/// would otherwise never hit the silence timeout).
pub const MAX_UTTERANCE_MS: u64 = 15_000;

/// Bound of the control-message queue between capture threads and the
/// control task.
///
/// Capture threads use `try_send`; a dropped switch request is re-derived on
/// the next energy observation, so a small bound suffices.
pub const CONTROL_QUEUE: usize = 16;

/// Bound of the recognition-event queue into the control task.
pub const EVENT_QUEUE: usize = 64;

/// Device name substrings that identify monitor/loopback sources for
/// ambient (system audio) capture on PipeWire/PulseAudio setups.
pub const MONITOR_PATTERNS: &[&str] = &["monitor", "loopback"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_timeout_shorter_than_max_utterance() {
        assert!(SILENCE_TIMEOUT_MS < MAX_UTTERANCE_MS);
    }

    #[test]
    fn energy_threshold_in_unit_range() {
        assert!(ENERGY_THRESHOLD > 0.0 && ENERGY_THRESHOLD < 1.0);
    }
}
