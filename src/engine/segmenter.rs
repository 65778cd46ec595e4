//! Utterance segmentation over the recognizer's incremental output.
//!
//! Converts the stream of partial transcripts into discrete committed
//! chunks. An utterance matures into a chunk when the partial stops changing
//! for the silence timeout, when the recognizer reports a final result, or
//! when the utterance exceeds the maximum duration cap. Commits are
//! deduplicated against the previously committed text.
//!
//! All methods run on the control task only; the silence deadline is exposed
//! to the controller, which owns the single pending timer.

use crate::audio::frame::Source;
use crate::clock::{Clock, SystemClock};
use crate::defaults;
use crate::sink::TranscriptSink;
use serde::Serialize;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Configuration for utterance segmentation.
#[derive(Debug, Clone, Copy)]
pub struct SegmenterConfig {
    /// Silence duration after the last partial update before committing.
    pub silence_timeout: Duration,
    /// Hard cap on utterance duration; exceeded utterances are force-committed.
    pub max_utterance: Duration,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            silence_timeout: Duration::from_millis(defaults::SILENCE_TIMEOUT_MS),
            max_utterance: Duration::from_millis(defaults::MAX_UTTERANCE_MS),
        }
    }
}

/// An immutable committed utterance.
///
/// Trimmed non-empty text, the source that spoke it, and the commit time as
/// Unix milliseconds. Produced once per utterance; never mutated after emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittedChunk {
    pub text: String,
    pub source: Source,
    pub timestamp_ms: u64,
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Segmenter state machine for one recognition session at a time.
pub struct UtteranceSegmenter<C: Clock = SystemClock> {
    config: SegmenterConfig,
    /// Source of the currently bound session; None before the first bind.
    source: Option<Source>,
    /// Latest partial text from the recognizer.
    current: String,
    /// Last committed text, for deduplication.
    last_committed: Option<String>,
    /// When the current utterance began.
    started: Instant,
    /// Pending silence deadline, re-armed on every partial update.
    deadline: Option<Instant>,
    sink: Box<dyn TranscriptSink>,
    clock: C,
}

impl<C: Clock> UtteranceSegmenter<C> {
    /// Creates a segmenter with the given configuration, sink and clock.
    pub fn with_clock(config: SegmenterConfig, sink: Box<dyn TranscriptSink>, clock: C) -> Self {
        let now = clock.now();
        Self {
            config,
            source: None,
            current: String::new(),
            last_committed: None,
            started: now,
            deadline: None,
            sink,
            clock,
        }
    }

    /// Re-arms segmentation state for a freshly bound session.
    ///
    /// Clears the partial, the dedup memory and the silence deadline, and
    /// restarts the utterance timer.
    pub fn reset(&mut self, source: Source) {
        self.source = Some(source);
        self.current.clear();
        self.last_committed = None;
        self.deadline = None;
        self.started = self.clock.now();
    }

    /// Handles one incremental result from the recognizer.
    ///
    /// A changed partial updates the live display and re-arms the silence
    /// deadline. The utterance is force-committed when it exceeds the
    /// duration cap or when the result is final.
    pub fn on_partial(&mut self, text: &str, is_final: bool) {
        let now = self.clock.now();

        if text != self.current {
            self.current = text.to_string();
            if let Some(source) = self.source {
                self.sink.partial(source, text);
            }
            self.deadline = Some(now + self.config.silence_timeout);
        }

        if now.duration_since(self.started) > self.config.max_utterance {
            self.commit();
        }

        if is_final {
            self.commit();
        }
    }

    /// Called by the controller when the silence deadline fires with no
    /// further partial update.
    pub fn on_silence_timeout(&mut self) {
        self.deadline = None;
        self.commit();
    }

    /// Commits any pending partial. Used before session teardown
    /// (source switch, pause, stop).
    pub fn flush(&mut self) {
        self.commit();
    }

    /// Finalizes the current partial into a [`CommittedChunk`].
    ///
    /// Empty (after trimming) partials reset the utterance timer without
    /// emitting. A chunk identical to the last committed text is dropped —
    /// the recognizer re-emits an unchanged final after a partial that
    /// already committed via timeout. Idempotent: a second call with no new
    /// partial in between is a no-op.
    pub fn commit(&mut self) {
        let now = self.clock.now();
        let trimmed = self.current.trim().to_string();

        self.current.clear();
        self.deadline = None;
        self.started = now;

        if trimmed.is_empty() {
            return;
        }

        if self.last_committed.as_deref() == Some(trimmed.as_str()) {
            return; // dedup
        }

        let Some(source) = self.source else {
            return;
        };

        let chunk = CommittedChunk {
            text: trimmed.clone(),
            source,
            timestamp_ms: unix_millis(),
        };
        self.last_committed = Some(trimmed);
        self.sink.commit(chunk);
    }

    /// Returns the pending silence deadline, if one is armed.
    pub fn silence_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the latest partial text.
    pub fn current_partial(&self) -> &str {
        &self.current
    }
}

impl UtteranceSegmenter<SystemClock> {
    /// Creates a segmenter with the given configuration using the system clock.
    pub fn new(config: SegmenterConfig, sink: Box<dyn TranscriptSink>) -> Self {
        Self::with_clock(config, sink, SystemClock)
    }
}
