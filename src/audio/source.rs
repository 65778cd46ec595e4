//! Capture source abstraction.
//!
//! The pipeline only sees this trait; the cpal-backed implementation lives
//! in [`crate::audio::capture`] behind the `cpal-audio` feature, and tests
//! substitute in-memory sources that invoke the callback directly.

use crate::audio::frame::NativeFormat;
use crate::error::Result;
use std::sync::Arc;

/// Callback invoked for every native buffer a capture device delivers.
///
/// Runs on the device's real-time thread, at an unbounded rate, with no
/// back-pressure signal available. Implementations must not block on I/O;
/// dropped or delayed processing is the only overload response.
pub type CaptureCallback = Arc<dyn Fn(&[f32], NativeFormat) + Send + Sync>;

/// A startable/stoppable capture channel.
pub trait CaptureSource: Send {
    /// Starts delivering buffers to `on_buffer`. Idempotent.
    fn start(&mut self, on_buffer: CaptureCallback) -> Result<()>;

    /// Stops capture and releases the device stream. Idempotent.
    fn stop(&mut self) -> Result<()>;

    /// Whether the underlying device stream is still delivering buffers.
    /// Capture failures (device unplugged) flip this to false; there is no
    /// automatic retry.
    fn healthy(&self) -> bool {
        true
    }
}
