//! Frame and source types shared across the capture path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// One of the two capture channels.
///
/// `Local` is the user's own microphone; `Ambient` is system/meeting audio
/// (the other participants). "No active source yet" is represented as
/// `Option<Source>` and, on the lock-free fast path, as the atomic tag
/// encoding below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Local,
    Ambient,
}

/// Atomic tag value meaning "no source".
pub(crate) const TAG_NONE: u8 = 0;

impl Source {
    /// Number of capture channels.
    pub const COUNT: usize = 2;

    /// Dense index for per-source storage.
    pub fn index(self) -> usize {
        match self {
            Source::Local => 0,
            Source::Ambient => 1,
        }
    }

    /// Encodes an optional source as an atomic tag (0 = none).
    pub(crate) fn to_tag(source: Option<Source>) -> u8 {
        match source {
            None => TAG_NONE,
            Some(Source::Local) => 1,
            Some(Source::Ambient) => 2,
        }
    }

    /// Decodes an atomic tag back into an optional source.
    pub(crate) fn from_tag(tag: u8) -> Option<Source> {
        match tag {
            1 => Some(Source::Local),
            2 => Some(Source::Ambient),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Local => write!(f, "local"),
            Source::Ambient => write!(f, "ambient"),
        }
    }
}

/// Native format of a raw capture buffer, as delivered by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

impl NativeFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

/// An immutable buffer of mono f32 samples at the canonical sample rate,
/// tagged with the source it came from.
///
/// Created by the format converter per incoming native buffer; consumed by
/// the energy detector and (conditionally) the active recognition session.
/// Never retained beyond one pipeline stage.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Which capture channel produced this buffer.
    pub source: Source,
    /// Mono samples in [-1.0, 1.0] at the canonical rate.
    pub samples: Vec<f32>,
    /// Monotonic timestamp taken when the frame was converted.
    pub captured: Instant,
}

impl AudioFrame {
    /// Creates a new audio frame stamped with the current instant.
    pub fn new(source: Source, samples: Vec<f32>) -> Self {
        Self {
            source,
            samples,
            captured: Instant::now(),
        }
    }

    /// Returns the duration of this frame in milliseconds.
    pub fn duration_ms(&self, sample_rate: u32) -> u32 {
        (self.samples.len() as u32 * 1000) / sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tag_round_trip() {
        assert_eq!(Source::from_tag(Source::to_tag(None)), None);
        assert_eq!(
            Source::from_tag(Source::to_tag(Some(Source::Local))),
            Some(Source::Local)
        );
        assert_eq!(
            Source::from_tag(Source::to_tag(Some(Source::Ambient))),
            Some(Source::Ambient)
        );
    }

    #[test]
    fn test_source_index_is_dense() {
        assert_eq!(Source::Local.index(), 0);
        assert_eq!(Source::Ambient.index(), 1);
        assert!(Source::Local.index() < Source::COUNT);
        assert!(Source::Ambient.index() < Source::COUNT);
    }

    #[test]
    fn test_source_display() {
        assert_eq!(Source::Local.to_string(), "local");
        assert_eq!(Source::Ambient.to_string(), "ambient");
    }

    #[test]
    fn test_source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Source::Local).unwrap(), "\"local\"");
        assert_eq!(
            serde_json::to_string(&Source::Ambient).unwrap(),
            "\"ambient\""
        );
    }

    #[test]
    fn test_audio_frame_creation() {
        let samples = vec![0.1f32, 0.2, 0.3];
        let frame = AudioFrame::new(Source::Local, samples.clone());

        assert_eq!(frame.source, Source::Local);
        assert_eq!(frame.samples, samples);
    }

    #[test]
    fn test_audio_frame_duration() {
        let samples = vec![0.0f32; 16000]; // 1 second at 16kHz
        let frame = AudioFrame::new(Source::Ambient, samples);

        assert_eq!(frame.duration_ms(16000), 1000);
    }
}
