//! Pipeline controller: wiring, lifecycle, and the control task.
//!
//! `Pipeline::start` assembles the full capture path — two capture sources,
//! the arbiter, the session manager, the segmenter and the sink — and spawns
//! a single control task that owns every lifecycle transition. Capture
//! callbacks stay cheap: convert, measure, observe, conditionally append;
//! anything heavier is dispatched to the control task over a bounded
//! channel.

use crate::audio::convert::convert_frame;
use crate::audio::energy::rms;
use crate::audio::frame::Source;
use crate::audio::source::{CaptureCallback, CaptureSource};
use crate::defaults;
use crate::engine::arbiter::{ArbiterConfig, SpeakerArbiter};
use crate::engine::segmenter::{SegmenterConfig, UtteranceSegmenter};
use crate::engine::session::{RecognitionEngine, SessionManager, StreamEvent};
use crate::error::Result;
use crate::sink::TranscriptSink;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Requests dispatched to the control task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    /// Rebind the recognition session to this source.
    Switch(Source),
    Pause,
    Resume,
    Stop,
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub arbiter: ArbiterConfig,
    pub segmenter: SegmenterConfig,
    /// Canonical sample rate every capture buffer is converted to.
    pub sample_rate: u32,
    /// Log committed source switches to stderr.
    pub log_switches: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            arbiter: ArbiterConfig::default(),
            segmenter: SegmenterConfig::default(),
            sample_rate: defaults::SAMPLE_RATE,
            log_switches: false,
        }
    }
}

/// Handle to a running pipeline.
///
/// Stop is one-shot and idempotent; dropping the handle stops the pipeline.
pub struct PipelineHandle {
    ctl_tx: mpsc::Sender<ControlMsg>,
    captures: Vec<Box<dyn CaptureSource>>,
    stopped: AtomicBool,
    join: Option<tokio::task::JoinHandle<()>>,
}

impl PipelineHandle {
    /// Stops capture and shuts down the control task.
    ///
    /// Captures stop first so no further frames or switch requests arrive,
    /// then the control task flushes the segmenter and tears the session
    /// down.
    pub fn stop(&mut self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        for capture in &mut self.captures {
            if let Err(e) = capture.stop() {
                eprintln!("crosstalk: capture stop failed: {}", e);
            }
        }
        let _ = self.ctl_tx.try_send(ControlMsg::Stop);
    }

    /// Requests a pause: pending text is flushed, the session torn down, and
    /// audio gated until `resume`.
    pub fn pause(&self) {
        let _ = self.ctl_tx.try_send(ControlMsg::Pause);
    }

    /// Requests a resume on the currently active source.
    pub fn resume(&self) {
        let _ = self.ctl_tx.try_send(ControlMsg::Resume);
    }

    /// Whether the control task is still running.
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Whether either capture stream has reported a failure.
    pub fn capture_failed(&self) -> bool {
        self.captures.iter().any(|c| !c.healthy())
    }

    /// Waits for the control task to exit. Call after `stop`.
    pub async fn join(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The assembled dual-source pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Starts capture on both sources and spawns the control task.
    ///
    /// Must be called within a tokio runtime. The initial active source is
    /// Local; the first session binds to it immediately, before any energy
    /// has been observed.
    pub fn start(
        config: PipelineConfig,
        mut local: Box<dyn CaptureSource>,
        mut ambient: Box<dyn CaptureSource>,
        engine: Arc<dyn RecognitionEngine>,
        sink: Box<dyn TranscriptSink>,
    ) -> Result<PipelineHandle> {
        let (ctl_tx, ctl_rx) = mpsc::channel::<ControlMsg>(defaults::CONTROL_QUEUE);
        let (event_tx, event_rx) = mpsc::channel::<StreamEvent>(defaults::EVENT_QUEUE);

        let arbiter = Arc::new(SpeakerArbiter::new(config.arbiter));
        arbiter.force_active(Source::Local);

        let session = Arc::new(SessionManager::new(engine, event_tx));
        let segmenter = UtteranceSegmenter::new(config.segmenter, sink);

        local.start(Self::capture_callback(
            Source::Local,
            config.sample_rate,
            Arc::clone(&arbiter),
            Arc::clone(&session),
            ctl_tx.clone(),
        ))?;
        if let Err(e) = ambient.start(Self::capture_callback(
            Source::Ambient,
            config.sample_rate,
            Arc::clone(&arbiter),
            Arc::clone(&session),
            ctl_tx.clone(),
        )) {
            let _ = local.stop();
            return Err(e);
        }

        // Bind the initial session before any speech is detected
        let _ = ctl_tx.try_send(ControlMsg::Switch(Source::Local));

        let join = tokio::spawn(control_task(
            segmenter,
            session,
            arbiter,
            ctl_rx,
            event_rx,
            config.log_switches,
        ));

        Ok(PipelineHandle {
            ctl_tx,
            captures: vec![local, ambient],
            stopped: AtomicBool::new(false),
            join: Some(join),
        })
    }

    /// Builds the per-source capture callback: convert to canonical format,
    /// measure energy, feed the arbiter, conditionally append to the live
    /// session. Runs on the capture thread; must never block.
    fn capture_callback(
        source: Source,
        sample_rate: u32,
        arbiter: Arc<SpeakerArbiter>,
        session: Arc<SessionManager>,
        ctl_tx: mpsc::Sender<ControlMsg>,
    ) -> CaptureCallback {
        Arc::new(move |samples, format| {
            let Some(frame) = convert_frame(samples, format, source, sample_rate) else {
                return;
            };
            let level = rms(&frame.samples);
            if let Some(next) = arbiter.observe(source, level) {
                // try_send: a dropped request is re-derived on the next
                // observation, so a full queue is harmless
                let _ = ctl_tx.try_send(ControlMsg::Switch(next));
            }
            session.append(source, &frame);
        })
    }
}

/// The control task: single owner of session lifecycle and segmentation.
async fn control_task(
    mut segmenter: UtteranceSegmenter,
    session: Arc<SessionManager>,
    arbiter: Arc<SpeakerArbiter>,
    mut ctl_rx: mpsc::Receiver<ControlMsg>,
    mut event_rx: mpsc::Receiver<StreamEvent>,
    log_switches: bool,
) {
    loop {
        let deadline = segmenter.silence_deadline();
        let sleep_target = deadline
            .map(tokio::time::Instant::from_std)
            .unwrap_or_else(|| tokio::time::Instant::now() + Duration::from_secs(3600));

        tokio::select! {
            msg = ctl_rx.recv() => {
                let Some(msg) = msg else { break };
                match msg {
                    ControlMsg::Switch(source) => {
                        if session.is_paused() || session.bound_source() == Some(source) {
                            continue;
                        }
                        // Pending text belongs to the outgoing source
                        segmenter.flush();
                        match session.rebind(source) {
                            Ok(()) => {
                                segmenter.reset(source);
                                if log_switches {
                                    eprintln!("crosstalk: active source -> {}", source);
                                }
                            }
                            Err(e) => eprintln!("crosstalk: rebind to {} failed: {}", source, e),
                        }
                    }
                    ControlMsg::Pause => {
                        if !session.is_paused() {
                            segmenter.flush();
                            session.pause();
                        }
                    }
                    ControlMsg::Resume => {
                        if session.is_paused() {
                            let source = arbiter.active().unwrap_or(Source::Local);
                            match session.resume(source) {
                                Ok(()) => segmenter.reset(source),
                                Err(e) => eprintln!("crosstalk: resume failed: {}", e),
                            }
                        }
                    }
                    ControlMsg::Stop => {
                        segmenter.flush();
                        session.teardown();
                        break;
                    }
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    StreamEvent::Partial { text, is_final } => {
                        segmenter.on_partial(&text, is_final);
                        if is_final && !session.is_paused() {
                            // The stream terminated with this result; rebind
                            // so listening continues on the active source
                            let source = session
                                .bound_source()
                                .or_else(|| arbiter.active())
                                .unwrap_or(Source::Local);
                            match session.rebind(source) {
                                Ok(()) => segmenter.reset(source),
                                Err(e) => {
                                    eprintln!("crosstalk: rebind after final failed: {}", e)
                                }
                            }
                        }
                    }
                    StreamEvent::Error(e) if e.transient => {
                        eprintln!("crosstalk: recognition: {}", e);
                    }
                    StreamEvent::Error(e) => {
                        eprintln!("crosstalk: recognition failed: {}", e);
                        if !session.is_paused() {
                            segmenter.flush();
                            let source = arbiter.active().unwrap_or(Source::Local);
                            match session.rebind(source) {
                                Ok(()) => segmenter.reset(source),
                                Err(e) => {
                                    eprintln!("crosstalk: recovery rebind failed: {}", e)
                                }
                            }
                        }
                    }
                }
            }
            _ = tokio::time::sleep_until(sleep_target), if deadline.is_some() => {
                segmenter.on_silence_timeout();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::NativeFormat;
    use crate::engine::session::NullEngine;
    use crate::sink::ChannelSink;
    use std::sync::Mutex;

    /// Capture source that hands its callback to the test.
    struct MockCapture {
        callback: Arc<Mutex<Option<CaptureCallback>>>,
        started: Arc<AtomicBool>,
    }

    impl MockCapture {
        fn new() -> (Self, Arc<Mutex<Option<CaptureCallback>>>, Arc<AtomicBool>) {
            let callback = Arc::new(Mutex::new(None));
            let started = Arc::new(AtomicBool::new(false));
            (
                Self {
                    callback: Arc::clone(&callback),
                    started: Arc::clone(&started),
                },
                callback,
                started,
            )
        }
    }

    impl CaptureSource for MockCapture {
        fn start(&mut self, on_buffer: CaptureCallback) -> Result<()> {
            *self.callback.lock().unwrap() = Some(on_buffer);
            self.started.store(true, Ordering::Release);
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.started.store(false, Ordering::Release);
            Ok(())
        }
    }

    fn push(cb: &Arc<Mutex<Option<CaptureCallback>>>, amplitude: f32, len: usize) {
        let guard = cb.lock().unwrap();
        if let Some(callback) = guard.as_ref() {
            callback(&vec![amplitude; len], NativeFormat::new(16000, 1));
        }
    }

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.arbiter.threshold, 0.01);
        assert_eq!(config.arbiter.hold, Duration::from_millis(1000));
        assert_eq!(config.segmenter.silence_timeout, Duration::from_millis(1200));
        assert_eq!(config.segmenter.max_utterance, Duration::from_millis(15_000));
        assert!(!config.log_switches);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_start_wires_both_captures() {
        let (local, local_cb, local_started) = MockCapture::new();
        let (ambient, _ambient_cb, ambient_started) = MockCapture::new();
        let (tx, _rx) = crossbeam_channel::unbounded();

        let mut handle = Pipeline::start(
            PipelineConfig::default(),
            Box::new(local),
            Box::new(ambient),
            Arc::new(NullEngine),
            Box::new(ChannelSink::new(tx)),
        )
        .unwrap();

        assert!(local_started.load(Ordering::Acquire));
        assert!(ambient_started.load(Ordering::Acquire));
        assert!(local_cb.lock().unwrap().is_some());

        handle.stop();
        handle.join().await;
        assert!(!local_started.load(Ordering::Acquire));
        assert!(!ambient_started.load(Ordering::Acquire));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_is_idempotent() {
        let (local, _cb, _s) = MockCapture::new();
        let (ambient, _cb2, _s2) = MockCapture::new();
        let (tx, _rx) = crossbeam_channel::unbounded();

        let mut handle = Pipeline::start(
            PipelineConfig::default(),
            Box::new(local),
            Box::new(ambient),
            Arc::new(NullEngine),
            Box::new(ChannelSink::new(tx)),
        )
        .unwrap();

        handle.stop();
        handle.stop();
        handle.join().await;
        assert!(!handle.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_frames_flow_through_callbacks() {
        let (local, local_cb, _s) = MockCapture::new();
        let (ambient, _cb, _s2) = MockCapture::new();
        let (tx, _rx) = crossbeam_channel::unbounded();

        let mut handle = Pipeline::start(
            PipelineConfig::default(),
            Box::new(local),
            Box::new(ambient),
            Arc::new(NullEngine),
            Box::new(ChannelSink::new(tx)),
        )
        .unwrap();

        // Loud local audio: callback must not panic without a live session
        push(&local_cb, 0.5, 1600);
        push(&local_cb, 0.5, 1600);

        handle.stop();
        handle.join().await;
    }
}
