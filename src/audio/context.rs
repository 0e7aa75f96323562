use std::time::Instant;

use anyhow::Result;
use log::{debug, info, warn};

use super::tone::ClickVoice;

/// A monotonic time source in seconds
pub trait AudioClock {
    fn now(&self) -> f64;
}

/// Wall-clock fallback used when there is no output device to drive time
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not producing output (platform autoplay policy, not yet started)
    Suspended,
    Running,
}

/// Platform output that can play click voices against its own clock
pub trait AudioBackend {
    /// Seconds of audio rendered so far
    fn current_time(&self) -> f64;

    fn state(&self) -> ContextState;

    fn resume(&mut self) -> Result<()>;

    /// Queue a voice to start at `voice.start`
    fn submit(&mut self, voice: ClickVoice) -> Result<()>;

    /// Drop every queued voice that has not started by `time`
    fn cancel_from(&mut self, time: f64) -> Result<()>;
}

pub type BackendFactory = Box<dyn FnOnce() -> Result<Box<dyn AudioBackend>>>;

enum Output {
    Pending(BackendFactory),
    Ready(Box<dyn AudioBackend>),
    Unavailable,
}

/// The process-wide audio output resource.
///
/// The backend is created on first use and never recreated. If creation or
/// resume fails the context becomes unavailable for good: clicks turn into
/// no-ops and time continues from a fallback clock so the transport keeps
/// running.
pub struct AudioContext {
    output: Output,
    fallback: Box<dyn AudioClock>,
    /// Added to the fallback clock so time stays continuous after losing the backend
    fallback_offset: f64,
}

impl AudioContext {
    pub fn new(factory: BackendFactory) -> Self {
        Self {
            output: Output::Pending(factory),
            fallback: Box::new(SystemClock::new()),
            fallback_offset: 0.0,
        }
    }

    #[cfg(test)]
    pub fn with_fallback_clock(mut self, clock: Box<dyn AudioClock>) -> Self {
        self.fallback = clock;
        self
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.output, Output::Unavailable)
    }

    #[cfg(test)]
    pub fn state(&self) -> Option<ContextState> {
        match &self.output {
            Output::Ready(backend) => Some(backend.state()),
            _ => None,
        }
    }

    pub fn current_time(&self) -> f64 {
        match &self.output {
            Output::Ready(backend) => backend.current_time(),
            _ => self.fallback.now() + self.fallback_offset,
        }
    }

    fn initialize(&mut self) {
        if !matches!(self.output, Output::Pending(_)) {
            return;
        }
        let Output::Pending(factory) = std::mem::replace(&mut self.output, Output::Unavailable)
        else {
            return;
        };
        match factory() {
            Ok(backend) => {
                info!("Audio output created");
                self.output = Output::Ready(backend);
            }
            Err(e) => {
                warn!("Audio output unavailable, continuing silently: {:#}", e);
                self.output = Output::Unavailable;
            }
        }
    }

    fn mark_unavailable(&mut self, reason: anyhow::Error) {
        let last = self.current_time();
        warn!("Audio output lost, continuing silently: {:#}", reason);
        self.output = Output::Unavailable;
        self.fallback_offset = last - self.fallback.now();
    }

    /// Create the output if needed and resume it if suspended. Idempotent.
    /// Returns true when the output is running.
    pub fn ensure_unlocked(&mut self) -> bool {
        self.initialize();
        let Output::Ready(backend) = &mut self.output else {
            return false;
        };
        if backend.state() == ContextState::Running {
            return true;
        }
        match backend.resume() {
            Ok(()) => {
                debug!("Audio output resumed");
                true
            }
            Err(e) => {
                self.mark_unavailable(e);
                false
            }
        }
    }

    /// Hand a voice to the output. Failures are logged, never returned.
    pub fn submit(&mut self, voice: ClickVoice) {
        if let Output::Ready(backend) = &mut self.output {
            if let Err(e) = backend.submit(voice) {
                warn!(
                    "Dropped {} click at {:.3}s: {:#}",
                    if voice.accent { "accent" } else { "normal" },
                    voice.start,
                    e
                );
            }
        }
    }

    pub fn cancel_from(&mut self, time: f64) {
        if let Output::Ready(backend) = &mut self.output {
            if let Err(e) = backend.cancel_from(time) {
                warn!("Failed to cancel pending clicks: {:#}", e);
            }
        }
    }
}
