//! Recognition session lifecycle management.
//!
//! Owns at most one live streaming-recognition session, bound to exactly one
//! source. The session is torn down and recreated whenever the arbiter
//! switches sources, pause is requested, or the upstream stream ends or
//! fails. Lifecycle transitions (bind, pause, resume, teardown) run
//! exclusively on the control task; only `append` is called from the capture
//! threads, gated by a lock-free source-tag check.

use crate::audio::frame::{AudioFrame, Source, TAG_NONE};
use crate::error::Result;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use tokio::sync::mpsc;

/// Error reported by the recognition engine for a live stream.
#[derive(Debug, Clone)]
pub struct RecognitionError {
    pub message: String,
    /// Transient errors (no speech detected, timeouts) are logged and
    /// swallowed; fatal errors trigger a managed rebind.
    pub transient: bool,
}

impl RecognitionError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }
}

impl fmt::Display for RecognitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Asynchronous output of a recognition stream, delivered to the control
/// task.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Incremental transcript. `is_final` marks a terminal result; the
    /// session is rebuilt afterwards so listening continues.
    Partial { text: String, is_final: bool },
    /// Engine-side failure.
    Error(RecognitionError),
}

/// A live append target for audio, produced by [`RecognitionEngine`].
///
/// `cancel` must be idempotent and callable from any thread; the owning
/// handle itself is only dropped on the control task.
pub trait RecognitionStream: Send + Sync {
    /// Appends canonical audio to the stream. Must not block on I/O.
    fn append(&self, frame: &AudioFrame);

    /// Cancels the stream. Idempotent.
    fn cancel(&self);
}

/// Factory for recognition streams — the external engine boundary.
///
/// Events for the opened stream are emitted on `events` from the engine's
/// own threads.
pub trait RecognitionEngine: Send + Sync {
    fn open_stream(
        &self,
        source: Source,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<Box<dyn RecognitionStream>>;
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Streaming,
    Ending,
}

/// Manager for the single live recognition session.
pub struct SessionManager {
    engine: Arc<dyn RecognitionEngine>,
    events_tx: mpsc::Sender<StreamEvent>,
    /// Source tag of the live session; `TAG_NONE` when idle or paused.
    /// Read lock-free on the append fast path.
    bound: AtomicU8,
    paused: AtomicBool,
    stream: Mutex<Option<Box<dyn RecognitionStream>>>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Creates a manager in the `Idle` state.
    ///
    /// `events_tx` is cloned into every opened stream so all session events
    /// funnel into the control task's single receiver.
    pub fn new(engine: Arc<dyn RecognitionEngine>, events_tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            engine,
            events_tx,
            bound: AtomicU8::new(TAG_NONE),
            paused: AtomicBool::new(false),
            stream: Mutex::new(None),
            state: Mutex::new(SessionState::Idle),
        }
    }

    /// Binds a fresh session to `source`, tearing down any previous one
    /// first.
    ///
    /// Control task only. The old stream is fully cancelled and released
    /// before the new request is constructed — two live requests must never
    /// coexist. Callers flush the segmenter before rebinding so pending
    /// utterances are committed under the old source tag.
    pub fn rebind(&self, source: Source) -> Result<()> {
        self.teardown();

        self.set_state(SessionState::Starting);
        let stream = match self.engine.open_stream(source, self.events_tx.clone()) {
            Ok(stream) => stream,
            Err(e) => {
                self.set_state(SessionState::Idle);
                return Err(e);
            }
        };

        if let Ok(mut slot) = self.stream.lock() {
            *slot = Some(stream);
        }
        self.bound.store(Source::to_tag(Some(source)), Ordering::Release);
        self.set_state(SessionState::Streaming);
        Ok(())
    }

    /// Conditionally appends a frame to the live stream.
    ///
    /// Callable from the capture threads. A no-op unless `source` matches
    /// the bound session source and the pipeline is not paused; frames from
    /// the inactive source are dropped, not buffered. Returns whether the
    /// frame was forwarded.
    pub fn append(&self, source: Source, frame: &AudioFrame) -> bool {
        if self.paused.load(Ordering::Acquire) {
            return false;
        }
        let tag = Source::to_tag(Some(source));
        if self.bound.load(Ordering::Acquire) != tag {
            return false;
        }

        let Ok(guard) = self.stream.lock() else {
            return false;
        };
        // Re-check under the lock: teardown clears the tag before cancelling,
        // so a frame can never land in a torn-down request.
        if self.bound.load(Ordering::Acquire) != tag {
            return false;
        }
        match guard.as_ref() {
            Some(stream) => {
                stream.append(frame);
                true
            }
            None => false,
        }
    }

    /// Cancels the current session, if any.
    ///
    /// The single idempotent cleanup routine every teardown path (switch,
    /// pause, stop, error rebind) converges on. Control task only.
    pub fn teardown(&self) {
        self.bound.store(TAG_NONE, Ordering::Release);
        self.set_state(SessionState::Ending);
        if let Ok(mut guard) = self.stream.lock()
            && let Some(stream) = guard.take()
        {
            stream.cancel();
        }
        self.set_state(SessionState::Idle);
    }

    /// Pauses recognition: tears down the session and gates appends.
    ///
    /// Arbitration state is untouched — `resume` rebinds to whatever source
    /// was last active. Callers flush the segmenter first.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        self.teardown();
    }

    /// Resumes recognition on `source` (the arbiter's current active
    /// source).
    pub fn resume(&self, source: Source) -> Result<()> {
        self.paused.store(false, Ordering::Release);
        self.rebind(source)
    }

    /// Returns the source of the live session, if any.
    pub fn bound_source(&self) -> Option<Source> {
        Source::from_tag(self.bound.load(Ordering::Acquire))
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(SessionState::Idle)
    }

    fn set_state(&self, next: SessionState) {
        if let Ok(mut state) = self.state.lock() {
            *state = next;
        }
    }
}

/// Engine that opens streams which discard all audio and emit nothing.
///
/// Useful for monitor mode (arbitration without recognition) and for
/// benchmarks.
pub struct NullEngine;

struct NullStream;

impl RecognitionStream for NullStream {
    fn append(&self, _frame: &AudioFrame) {}
    fn cancel(&self) {}
}

impl RecognitionEngine for NullEngine {
    fn open_stream(
        &self,
        _source: Source,
        _events: mpsc::Sender<StreamEvent>,
    ) -> Result<Box<dyn RecognitionStream>> {
        Ok(Box::new(NullStream))
    }
}
