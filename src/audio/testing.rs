//! Deterministic doubles for the audio collaborators

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{anyhow, Result};

use super::context::{AudioBackend, AudioClock, AudioContext, ContextState};
use super::recorder::{Recorder, Recording};
use super::tone::ClickVoice;
use crate::error::RecorderError;

/// A clock that only moves when told to
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: f64) {
        self.now.set(now);
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Default)]
struct CaptureInner {
    created: usize,
    resumes: usize,
    fail_resume: bool,
    voices: Vec<ClickVoice>,
    cancels: Vec<f64>,
}

/// Shared view of what a `CaptureBackend` received
#[derive(Clone, Default)]
pub struct CaptureLog {
    inner: Rc<RefCell<CaptureInner>>,
}

impl CaptureLog {
    pub fn voices(&self) -> Vec<ClickVoice> {
        self.inner.borrow().voices.clone()
    }

    pub fn cancels(&self) -> Vec<f64> {
        self.inner.borrow().cancels.clone()
    }

    pub fn created(&self) -> usize {
        self.inner.borrow().created
    }

    pub fn resumes(&self) -> usize {
        self.inner.borrow().resumes
    }

    pub fn fail_resume(&self) {
        self.inner.borrow_mut().fail_resume = true;
    }
}

/// Backend that records voices instead of playing them
pub struct CaptureBackend {
    clock: ManualClock,
    state: ContextState,
    log: CaptureLog,
}

impl CaptureBackend {
    pub fn new(clock: ManualClock) -> (Self, CaptureLog) {
        let log = CaptureLog::default();
        log.inner.borrow_mut().created += 1;
        let backend = Self {
            clock,
            state: ContextState::Suspended,
            log: log.clone(),
        };
        (backend, log)
    }
}

impl AudioBackend for CaptureBackend {
    fn current_time(&self) -> f64 {
        self.clock.now()
    }

    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        let mut inner = self.log.inner.borrow_mut();
        inner.resumes += 1;
        if inner.fail_resume {
            return Err(anyhow!("resume refused"));
        }
        self.state = ContextState::Running;
        Ok(())
    }

    fn submit(&mut self, voice: ClickVoice) -> Result<()> {
        self.log.inner.borrow_mut().voices.push(voice);
        Ok(())
    }

    fn cancel_from(&mut self, time: f64) -> Result<()> {
        let mut inner = self.log.inner.borrow_mut();
        inner.cancels.push(time);
        inner.voices.retain(|v| v.start < time);
        Ok(())
    }
}

/// A context whose backend is built lazily from a `CaptureBackend`
pub fn capture_context(clock: ManualClock) -> (AudioContext, CaptureLog) {
    let log = CaptureLog::default();
    let factory_log = log.clone();
    let fallback = clock.clone();
    let ctx = AudioContext::new(Box::new(move || {
        factory_log.inner.borrow_mut().created += 1;
        let backend = CaptureBackend {
            clock,
            state: ContextState::Suspended,
            log: factory_log,
        };
        Ok(Box::new(backend) as Box<dyn AudioBackend>)
    }))
    .with_fallback_clock(Box::new(fallback));
    (ctx, log)
}

/// A context whose backend can never be created
pub fn unavailable_context(clock: ManualClock) -> AudioContext {
    AudioContext::new(Box::new(|| Err(anyhow!("no output device"))))
        .with_fallback_clock(Box::new(clock))
}

#[derive(Default)]
struct RecorderInner {
    deny: bool,
    armed: usize,
    starts: Vec<f64>,
    stops: usize,
    disarms: usize,
}

/// Shared view of the calls a `FakeRecorder` received
#[derive(Clone, Default)]
pub struct RecorderLog {
    inner: Rc<RefCell<RecorderInner>>,
}

impl RecorderLog {
    pub fn armed(&self) -> usize {
        self.inner.borrow().armed
    }

    pub fn starts(&self) -> Vec<f64> {
        self.inner.borrow().starts.clone()
    }

    pub fn stops(&self) -> usize {
        self.inner.borrow().stops
    }

    pub fn disarms(&self) -> usize {
        self.inner.borrow().disarms
    }
}

pub struct FakeRecorder {
    log: RecorderLog,
    capturing: bool,
}

impl FakeRecorder {
    pub fn new() -> (Self, RecorderLog) {
        let log = RecorderLog::default();
        (
            Self {
                log: log.clone(),
                capturing: false,
            },
            log,
        )
    }

    /// A recorder whose microphone permission is always refused
    pub fn denied() -> (Self, RecorderLog) {
        let (recorder, log) = Self::new();
        log.inner.borrow_mut().deny = true;
        (recorder, log)
    }
}

impl Recorder for FakeRecorder {
    fn arm(&mut self) -> Result<(), RecorderError> {
        let mut inner = self.log.inner.borrow_mut();
        if inner.deny {
            return Err(RecorderError::PermissionDenied("user refused".into()));
        }
        inner.armed += 1;
        Ok(())
    }

    fn start(&mut self, lead_in: f64) -> Result<(), RecorderError> {
        self.log.inner.borrow_mut().starts.push(lead_in);
        self.capturing = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<Option<Recording>, RecorderError> {
        self.log.inner.borrow_mut().stops += 1;
        if !std::mem::take(&mut self.capturing) {
            return Ok(None);
        }
        Ok(Some(Recording {
            path: PathBuf::from("take-001.wav"),
            duration_secs: 1.0,
            frames: 44100,
        }))
    }

    fn disarm(&mut self) {
        self.log.inner.borrow_mut().disarms += 1;
        self.capturing = false;
    }
}
