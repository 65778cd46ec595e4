//! crosstalk - Dual-source speech arbitration for meeting transcription
//!
//! Captures the local microphone and the system (meeting) audio as two
//! independent streams, decides which one is actually speaking, and feeds
//! exactly one of them into a single streaming recognition session whose
//! output is segmented into source-tagged utterance chunks.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod sink;

// Core traits (capture → arbitrate → recognize → sink)
pub use audio::source::{CaptureCallback, CaptureSource};
pub use engine::session::{RecognitionEngine, RecognitionStream};
pub use sink::{ChannelSink, StdoutSink, TranscriptSink};

// Pipeline
pub use engine::controller::{Pipeline, PipelineConfig, PipelineHandle};
pub use engine::segmenter::CommittedChunk;

// Source and frame types
pub use audio::frame::{AudioFrame, NativeFormat, Source};

// Error handling
pub use error::{CrosstalkError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.2+abc1234"` when git hash is available, `"0.1.2"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
