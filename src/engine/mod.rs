//! Arbitration, session and segmentation engine.
//!
//! The engine sits between the audio layer and the transcript sink:
//! per-source energy observations drive the [`arbiter`], the arbiter's
//! decisions drive the single recognition session owned by [`session`], the
//! session's incremental results are shaped into committed chunks by
//! [`segmenter`], and [`controller`] wires the whole thing together around
//! one control task.

pub mod arbiter;
pub mod controller;
pub mod segmenter;
pub mod session;

pub use arbiter::{ArbiterConfig, SpeakerArbiter};
pub use controller::{ControlMsg, Pipeline, PipelineConfig, PipelineHandle};
pub use segmenter::{CommittedChunk, SegmenterConfig, UtteranceSegmenter};
pub use session::{
    NullEngine, RecognitionEngine, RecognitionError, RecognitionStream, SessionManager,
    SessionState, StreamEvent,
};
