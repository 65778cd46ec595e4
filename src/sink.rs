//! Pluggable transcript output handlers.
//!
//! Pairs with `CaptureSource` on the input side: the segmenter hands live
//! partials and committed chunks to a `TranscriptSink`. Sinks must be
//! non-blocking — the segmenter never waits on a sink to proceed, so
//! anything slow (network dispatch) belongs behind a channel.

use crate::audio::frame::Source;
use crate::engine::segmenter::CommittedChunk;

/// Pluggable transcript output handler.
pub trait TranscriptSink: Send + 'static {
    /// Live partial text for the active source. Default: ignored.
    fn partial(&mut self, _source: Source, _text: &str) {}

    /// A committed utterance chunk. Called exactly once per chunk.
    fn commit(&mut self, chunk: CommittedChunk);

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Writes committed chunks to stdout, one per line.
///
/// Plain mode prints `[source] text`; JSON mode prints one JSON object per
/// line for downstream dispatch.
pub struct StdoutSink {
    json: bool,
}

impl StdoutSink {
    pub fn new() -> Self {
        Self { json: false }
    }

    pub fn json() -> Self {
        Self { json: true }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSink for StdoutSink {
    fn commit(&mut self, chunk: CommittedChunk) {
        if self.json {
            match serde_json::to_string(&chunk) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("crosstalk: failed to serialize chunk: {}", e),
            }
        } else {
            println!("[{}] {}", chunk.source, chunk.text);
        }
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}

/// Forwards committed chunks over a crossbeam channel.
///
/// The send is non-blocking by construction (unbounded channel); a
/// disconnected receiver drops the chunk silently, which is acceptable
/// during shutdown.
pub struct ChannelSink {
    tx: crossbeam_channel::Sender<CommittedChunk>,
}

impl ChannelSink {
    pub fn new(tx: crossbeam_channel::Sender<CommittedChunk>) -> Self {
        Self { tx }
    }
}

impl TranscriptSink for ChannelSink {
    fn commit(&mut self, chunk: CommittedChunk) {
        let _ = self.tx.send(chunk);
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}
