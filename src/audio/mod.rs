//! Audio capture and conditioning.
//!
//! Everything that happens on the real-time capture threads before frames
//! reach the arbitration engine: device capture, format conversion to the
//! canonical mono f32 16kHz, and RMS energy detection.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod convert;
pub mod energy;
pub mod frame;
pub mod source;

#[cfg(feature = "cpal-audio")]
pub use capture::{CpalCapture, list_devices};
pub use convert::convert_frame;
pub use energy::rms;
pub use frame::{AudioFrame, NativeFormat, Source};
pub use source::{CaptureCallback, CaptureSource};
