//! Real audio capture using CPAL (Cross-Platform Audio Library).
//!
//! Two capture channels run at once: the local microphone and an ambient
//! (system/monitor) device carrying the other meeting participants. Each
//! delivers native-format buffers on its own real-time callback thread; the
//! callback must drain promptly and never block.

use crate::audio::frame::NativeFormat;
use crate::audio::source::{CaptureCallback, CaptureSource};
use crate::defaults;
use crate::error::{CrosstalkError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Device name patterns to filter out (not useful for voice input).
const FILTERED_PATTERNS: &[&str] = &[
    "surround",
    "front:",
    "rear:",
    "center:",
    "side:",
    "Digital Output",
    "HDMI",
    "S/PDIF",
];

/// Check if a device name should be filtered out.
fn should_filter_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    FILTERED_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// Check if a device is a preferred device.
fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// Check if a device looks like a monitor/loopback source (ambient capture).
fn is_monitor_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    defaults::MONITOR_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

/// List all available audio input devices with filtering and annotations.
///
/// # Returns
/// A vector of device names. Preferred devices are marked `[recommended]`,
/// monitor/loopback devices (candidates for ambient capture) are marked
/// `[monitor]`. Obviously unusable devices (surround channels, HDMI) are
/// filtered out.
///
/// # Errors
/// Returns `CrosstalkError::AudioCapture` if device enumeration fails.
pub fn list_devices() -> Result<Vec<String>> {
    let (host, devices) = with_suppressed_stderr(|| {
        let host = cpal::default_host();
        let devices = host.input_devices();
        (host, devices)
    });
    let _ = host; // keep host alive while iterating devices
    let devices = devices.map_err(|e| CrosstalkError::AudioCapture {
        message: format!("Failed to enumerate input devices: {}", e),
    })?;

    let mut device_names = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            if should_filter_device(&name) {
                continue;
            }

            if is_monitor_device(&name) {
                device_names.push(format!("{} [monitor]", name));
            } else if is_preferred_device(&name) {
                device_names.push(format!("{} [recommended]", name));
            } else {
                device_names.push(name);
            }
        }
    }

    Ok(device_names)
}

/// Find a named input device.
fn find_device(host: &cpal::Host, name: &str) -> Result<cpal::Device> {
    let devices = host
        .input_devices()
        .map_err(|e| CrosstalkError::AudioCapture {
            message: format!("Failed to enumerate devices: {}", e),
        })?;

    for device in devices {
        if let Ok(dev_name) = device.name()
            && dev_name == name
        {
            return Ok(device);
        }
    }

    Err(CrosstalkError::AudioDeviceNotFound {
        device: name.to_string(),
    })
}

/// Get the best default microphone device, preferring PipeWire/PulseAudio.
///
/// This ensures we respect the desktop's audio device selection.
fn get_best_default_device(host: &cpal::Host) -> Result<cpal::Device> {
    if let Ok(devices) = host.input_devices() {
        for device in devices {
            if let Ok(name) = device.name()
                && is_preferred_device(&name)
            {
                return Ok(device);
            }
        }
    }

    host.default_input_device()
        .ok_or_else(|| CrosstalkError::AudioDeviceNotFound {
            device: "default".to_string(),
        })
}

/// Find the first monitor/loopback device for ambient capture.
fn find_monitor_device(host: &cpal::Host) -> Result<cpal::Device> {
    if let Ok(devices) = host.input_devices() {
        for device in devices {
            if let Ok(name) = device.name()
                && is_monitor_device(&name)
            {
                return Ok(device);
            }
        }
    }

    Err(CrosstalkError::AudioDeviceNotFound {
        device: "monitor".to_string(),
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only accessed from the thread that owns the
/// CpalCapture, and its methods are called synchronously. The wrapper only
/// exists so the capture can be moved into the pipeline handle.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Real capture channel backed by a CPAL input stream.
///
/// Captures at the device's native config and hands raw f32 buffers plus
/// their [`NativeFormat`] to the callback; format conversion happens
/// downstream in [`crate::audio::convert`]. i16-only devices are widened to
/// f32 at this boundary.
pub struct CpalCapture {
    device: cpal::Device,
    stream: Option<SendableStream>,
    failure: Arc<AtomicBool>,
}

impl CpalCapture {
    /// Open the local microphone channel.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the best
    ///   default input device (prefers PipeWire/PulseAudio).
    pub fn local(device_name: Option<&str>) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();
            match device_name {
                Some(name) => find_device(&host, name),
                None => get_best_default_device(&host),
            }
        })?;

        Ok(Self {
            device,
            stream: None,
            failure: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Open the ambient (system audio) channel.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the first
    ///   monitor/loopback device found.
    ///
    /// # Errors
    /// Returns `CrosstalkError::AudioDeviceNotFound` when no monitor device
    /// exists (e.g., no system-audio loopback configured).
    pub fn ambient(device_name: Option<&str>) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();
            match device_name {
                Some(name) => find_device(&host, name),
                None => find_monitor_device(&host),
            }
        })?;

        Ok(Self {
            device,
            stream: None,
            failure: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Build the input stream at the device's native config.
    fn build_stream(&self, on_buffer: CaptureCallback) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let default_config =
            self.device
                .default_input_config()
                .map_err(|e| CrosstalkError::AudioCapture {
                    message: format!("Failed to query default input config: {}", e),
                })?;

        let native_rate = default_config.sample_rate();
        let native_channels = default_config.channels();
        let format = NativeFormat::new(native_rate, native_channels);
        let stream_config: cpal::StreamConfig = default_config.clone().into();

        let failure = Arc::clone(&self.failure);
        let err_callback = move |err| {
            eprintln!("crosstalk: audio stream error: {}", err);
            failure.store(true, Ordering::Release);
        };

        match default_config.sample_format() {
            SampleFormat::F32 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        on_buffer(data, format);
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| CrosstalkError::AudioCapture {
                    message: format!("Failed to build f32 stream: {}", e),
                }),
            SampleFormat::I16 => self
                .device
                .build_input_stream(
                    &stream_config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let widened: Vec<f32> =
                            data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                        on_buffer(&widened, format);
                    },
                    err_callback,
                    None,
                )
                .map_err(|e| CrosstalkError::AudioCapture {
                    message: format!("Failed to build i16 stream: {}", e),
                }),
            fmt => Err(CrosstalkError::AudioCapture {
                message: format!(
                    "Unsupported native sample format: {:?}. \
                     Try specifying a device explicitly.",
                    fmt
                ),
            }),
        }
    }
}

impl CaptureSource for CpalCapture {
    fn start(&mut self, on_buffer: CaptureCallback) -> Result<()> {
        if self.stream.is_some() {
            return Ok(()); // Already started
        }

        let stream = self.build_stream(on_buffer)?;
        stream.play().map_err(|e| CrosstalkError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        self.stream = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(sendable_stream) = self.stream.take() {
            sendable_stream
                .0
                .pause()
                .map_err(|e| CrosstalkError::AudioCapture {
                    message: format!("Failed to stop audio stream: {}", e),
                })?;
        }
        Ok(())
    }

    fn healthy(&self) -> bool {
        !self.failure.load(Ordering::Acquire)
    }
}
