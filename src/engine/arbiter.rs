//! Speaker arbitration between the two capture channels.
//!
//! A debounced state machine that turns the per-source loudness signals into
//! a single "active source" decision. Observations arrive from both capture
//! callback threads; the decision is stored in an atomic tag so the append
//! fast path never takes a lock, and the switch transition itself is guarded
//! by a short-held mutex.

use crate::audio::frame::Source;
use crate::clock::{Clock, SystemClock};
use crate::defaults;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// Configuration for speaker arbitration.
#[derive(Debug, Clone, Copy)]
pub struct ArbiterConfig {
    /// Minimum RMS level for a source to count as "speaking".
    pub threshold: f32,
    /// Minimum interval between committed switches.
    pub hold: Duration,
    /// Winner when both sources speak at once. Defaults to Ambient: the
    /// other participants take precedence over self. An empirical rule, so
    /// it stays configurable.
    pub overlap_winner: Source,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::ENERGY_THRESHOLD,
            hold: Duration::from_millis(defaults::HOLD_MS),
            overlap_winner: Source::Ambient,
        }
    }
}

/// Mutable arbitration state guarded by the mutex.
#[derive(Debug)]
struct ArbiterState {
    /// Last observed RMS per source, indexed by `Source::index`.
    levels: [f32; Source::COUNT],
    /// Instant of the last committed switch (or arbiter startup).
    last_switch: Instant,
}

/// Debounced active-speaker arbiter.
///
/// Shared between both capture threads and the control task. `observe` is
/// called inline from the capture callbacks; when it commits a switch it
/// returns the new source so the caller can dispatch a rebind request to the
/// control task.
pub struct SpeakerArbiter<C: Clock = SystemClock> {
    config: ArbiterConfig,
    /// Active source tag, readable lock-free from any thread.
    active: AtomicU8,
    state: Mutex<ArbiterState>,
    clock: C,
}

impl<C: Clock> SpeakerArbiter<C> {
    /// Creates an arbiter with the given configuration and clock.
    ///
    /// The startup instant counts as the last switch, so the very first
    /// selection is also debounced by `hold`.
    pub fn with_clock(config: ArbiterConfig, clock: C) -> Self {
        let now = clock.now();
        Self {
            config,
            active: AtomicU8::new(Source::to_tag(None)),
            state: Mutex::new(ArbiterState {
                levels: [0.0; Source::COUNT],
                last_switch: now,
            }),
            clock,
        }
    }

    /// Records a new energy observation and recomputes the desired active
    /// source.
    ///
    /// Returns `Some(source)` when a switch is committed; the caller is
    /// responsible for forwarding the switch to the control task. Precedence:
    /// - both sources below threshold → retain the current active source;
    /// - exactly one above → that source is desired;
    /// - both above → the configured overlap winner (default Ambient:
    ///   other participants take precedence over self).
    ///
    /// A desired source that differs from the current one is suppressed
    /// until `hold` has elapsed since the last committed switch.
    pub fn observe(&self, source: Source, level: f32) -> Option<Source> {
        let Ok(mut state) = self.state.lock() else {
            return None;
        };
        state.levels[source.index()] = level;

        let local = state.levels[Source::Local.index()] > self.config.threshold;
        let ambient = state.levels[Source::Ambient.index()] > self.config.threshold;

        let desired = match (local, ambient) {
            (false, false) => return None,
            (true, false) => Source::Local,
            (false, true) => Source::Ambient,
            // Overlapping speech: the configured winner (default Ambient)
            (true, true) => self.config.overlap_winner,
        };

        if self.active() == Some(desired) {
            return None;
        }

        let now = self.clock.now();
        if now.duration_since(state.last_switch) < self.config.hold {
            return None; // debounced
        }

        state.last_switch = now;
        self.active
            .store(Source::to_tag(Some(desired)), Ordering::Release);
        Some(desired)
    }

    /// Returns the currently active source, if any. Lock-free.
    pub fn active(&self) -> Option<Source> {
        Source::from_tag(self.active.load(Ordering::Acquire))
    }

    /// Returns the last observed RMS for a source.
    pub fn level(&self, source: Source) -> f32 {
        self.state
            .lock()
            .map(|state| state.levels[source.index()])
            .unwrap_or(0.0)
    }

    /// Forces the active source without debounce.
    ///
    /// Used by the controller to seed arbitration at startup (initial active
    /// source = Local). Resets the hold window.
    pub fn force_active(&self, source: Source) {
        if let Ok(mut state) = self.state.lock() {
            state.last_switch = self.clock.now();
        }
        self.active
            .store(Source::to_tag(Some(source)), Ordering::Release);
    }
}

impl SpeakerArbiter<SystemClock> {
    /// Creates an arbiter with the given configuration using the system clock.
    pub fn new(config: ArbiterConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::mock::MockClock;

    fn arbiter(hold_ms: u64) -> (SpeakerArbiter<MockClock>, MockClock) {
        let clock = MockClock::new();
        let config = ArbiterConfig {
            threshold: 0.01,
            hold: Duration::from_millis(hold_ms),
            ..ArbiterConfig::default()
        };
        (SpeakerArbiter::with_clock(config, clock.clone()), clock)
    }

    #[test]
    fn test_starts_with_no_active_source() {
        let (arb, _clock) = arbiter(100);
        assert_eq!(arb.active(), None);
    }

    #[test]
    fn test_first_selection_waits_for_hold() {
        let (arb, clock) = arbiter(100);

        // Local speaks immediately after startup: debounced
        assert_eq!(arb.observe(Source::Local, 0.05), None);
        assert_eq!(arb.active(), None);

        // After the hold elapses the switch commits
        clock.advance(Duration::from_millis(100));
        assert_eq!(arb.observe(Source::Local, 0.05), Some(Source::Local));
        assert_eq!(arb.active(), Some(Source::Local));
    }

    #[test]
    fn test_startup_scenario_local_above_ambient_silent() {
        // Local energy 0.05 (above 0.01 threshold), Ambient 0.0
        let (arb, clock) = arbiter(100);
        arb.observe(Source::Ambient, 0.0);
        arb.observe(Source::Local, 0.05);
        assert_eq!(arb.active(), None);

        clock.advance(Duration::from_millis(101));
        assert_eq!(arb.observe(Source::Local, 0.05), Some(Source::Local));
    }

    #[test]
    fn test_no_double_switch_within_hold() {
        let (arb, clock) = arbiter(100);
        clock.advance(Duration::from_millis(100));
        assert_eq!(arb.observe(Source::Local, 0.05), Some(Source::Local));

        // Ambient takes over immediately: suppressed until hold elapses
        assert_eq!(arb.observe(Source::Ambient, 0.08), None);
        assert_eq!(arb.active(), Some(Source::Local));

        clock.advance(Duration::from_millis(99));
        assert_eq!(arb.observe(Source::Ambient, 0.08), None);

        clock.advance(Duration::from_millis(1));
        assert_eq!(arb.observe(Source::Ambient, 0.08), Some(Source::Ambient));
    }

    #[test]
    fn test_ambient_wins_when_both_above_threshold() {
        let (arb, clock) = arbiter(50);
        clock.advance(Duration::from_millis(50));

        // Local crossed the threshold first, but both are above now
        arb.observe(Source::Local, 0.05);
        assert_eq!(arb.active(), Some(Source::Local));

        clock.advance(Duration::from_millis(50));
        assert_eq!(arb.observe(Source::Ambient, 0.02), Some(Source::Ambient));
        assert_eq!(arb.active(), Some(Source::Ambient));

        // Local speaking louder does not win overlap back
        clock.advance(Duration::from_millis(50));
        assert_eq!(arb.observe(Source::Local, 0.5), None);
        assert_eq!(arb.active(), Some(Source::Ambient));
    }

    #[test]
    fn test_both_below_threshold_retains_active() {
        let (arb, clock) = arbiter(50);
        clock.advance(Duration::from_millis(50));
        arb.observe(Source::Local, 0.05);
        assert_eq!(arb.active(), Some(Source::Local));

        // Everyone goes quiet: no switch, active source retained
        clock.advance(Duration::from_millis(200));
        assert_eq!(arb.observe(Source::Local, 0.0), None);
        assert_eq!(arb.observe(Source::Ambient, 0.0), None);
        assert_eq!(arb.active(), Some(Source::Local));
    }

    #[test]
    fn test_level_at_threshold_is_not_speaking() {
        let (arb, clock) = arbiter(10);
        clock.advance(Duration::from_millis(10));
        assert_eq!(arb.observe(Source::Local, 0.01), None);
        assert_eq!(arb.active(), None);
    }

    #[test]
    fn test_force_active_seeds_without_debounce() {
        let (arb, clock) = arbiter(100);
        arb.force_active(Source::Local);
        assert_eq!(arb.active(), Some(Source::Local));

        // Hold window restarts from the forced switch
        assert_eq!(arb.observe(Source::Ambient, 0.05), None);
        clock.advance(Duration::from_millis(100));
        assert_eq!(arb.observe(Source::Ambient, 0.05), Some(Source::Ambient));
    }

    #[test]
    fn test_observe_stores_levels() {
        let (arb, _clock) = arbiter(100);
        arb.observe(Source::Local, 0.2);
        arb.observe(Source::Ambient, 0.3);
        assert_eq!(arb.level(Source::Local), 0.2);
        assert_eq!(arb.level(Source::Ambient), 0.3);
    }

    #[test]
    fn test_overlap_winner_is_configurable() {
        let clock = MockClock::new();
        let config = ArbiterConfig {
            threshold: 0.01,
            hold: Duration::from_millis(50),
            overlap_winner: Source::Local,
        };
        let arb = SpeakerArbiter::with_clock(config, clock.clone());

        clock.advance(Duration::from_millis(50));
        arb.observe(Source::Ambient, 0.05);
        assert_eq!(arb.active(), Some(Source::Ambient));

        // Both above threshold: the configured winner takes over
        clock.advance(Duration::from_millis(50));
        assert_eq!(arb.observe(Source::Local, 0.05), Some(Source::Local));
    }

    #[test]
    fn test_switch_back_after_hold() {
        let (arb, clock) = arbiter(100);
        clock.advance(Duration::from_millis(100));
        arb.observe(Source::Ambient, 0.05);
        assert_eq!(arb.active(), Some(Source::Ambient));

        // Ambient goes quiet, local speaks
        arb.observe(Source::Ambient, 0.0);
        clock.advance(Duration::from_millis(100));
        assert_eq!(arb.observe(Source::Local, 0.05), Some(Source::Local));
    }
}
