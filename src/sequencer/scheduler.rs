use std::time::{Duration, Instant};

use log::{error, info, trace, warn};

use super::pattern::Pattern;
use super::task::RepeatingTask;
use super::tempo::Tempo;
use super::transport::{TransportPhase, TransportState};
use crate::audio::{AudioContext, Recorder, Recording, ToneGenerator};
use crate::config::SchedulerConfig;
use crate::error::TransportError;

/// Notifications other than step changes
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The count-in bar finished; `recording` is true if capture began
    CountInComplete { recording: bool },
    RecordingFinished(Recording),
    RecordingFailed(String),
}

pub type StepListener = Box<dyn FnMut(Option<usize>)>;
pub type EventListener = Box<dyn FnMut(TransportEvent)>;

/// Look-ahead click scheduler.
///
/// The host loop calls [`poll`](Self::poll) frequently; every
/// `lookahead_interval` a tick reads the audio clock once and queues every
/// slot that falls inside the next `schedule_ahead` seconds. Click timing
/// therefore depends only on the audio clock, never on how punctual the
/// polling is.
pub struct LookaheadScheduler {
    config: SchedulerConfig,
    context: AudioContext,
    tone: ToneGenerator,
    recorder: Option<Box<dyn Recorder>>,
    state: TransportState,
    task: RepeatingTask,
    step_listener: Option<StepListener>,
    event_listener: Option<EventListener>,
}

impl LookaheadScheduler {
    pub fn new(context: AudioContext, config: SchedulerConfig) -> Self {
        let config = config.sanitized();
        Self {
            task: RepeatingTask::new(config.lookahead_interval()),
            config,
            context,
            tone: ToneGenerator::new(),
            recorder: None,
            state: TransportState::new(Tempo::default(), Pattern::default()),
            step_listener: None,
            event_listener: None,
        }
    }

    pub fn with_recorder(mut self, recorder: Box<dyn Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Register the step-change listener. Receives None when the transport stops.
    pub fn on_step(&mut self, listener: impl FnMut(Option<usize>) + 'static) {
        self.step_listener = Some(Box::new(listener));
    }

    pub fn on_event(&mut self, listener: impl FnMut(TransportEvent) + 'static) {
        self.event_listener = Some(Box::new(listener));
    }

    /// Start a play session.
    ///
    /// With `record`, the microphone is armed before anything else; if that is
    /// refused the transport stays stopped. Capture itself begins when the
    /// count-in ends (or right away without a count-in).
    pub fn start(
        &mut self,
        pattern: Pattern,
        tempo: Tempo,
        count_in: bool,
        record: bool,
    ) -> Result<(), TransportError> {
        if self.state.playing {
            return Err(TransportError::AlreadyRunning);
        }

        if record {
            let recorder = self
                .recorder
                .as_mut()
                .ok_or(TransportError::RecorderMissing)?;
            if let Err(e) = recorder.arm() {
                warn!("Recording refused: {}", e);
                return Err(e.into());
            }
        }

        if !self.context.ensure_unlocked() {
            warn!("Starting without audio output");
        }

        let now = self.context.current_time();
        self.state.tempo = tempo;
        self.state.pattern = pattern;
        self.state
            .reset(now + self.config.start_offset_secs, count_in, record);
        info!(
            "Transport started: {}, count-in {}, recording {}",
            tempo,
            if count_in { "on" } else { "off" },
            if record { "requested" } else { "off" }
        );

        if record && !count_in {
            self.state.recording_requested = false;
            self.begin_recording(self.config.start_offset_secs);
        }

        self.tick();
        self.task.arm(Instant::now());
        Ok(())
    }

    /// Stop from any state. Pending clicks that have not started are cancelled
    /// and an in-progress take is finalized.
    pub fn stop(&mut self) {
        self.task.cancel();
        if !self.state.playing {
            return;
        }

        let now = self.context.current_time();
        self.context.cancel_from(now);

        if let Some(recorder) = self.recorder.as_mut() {
            if self.state.recording {
                match recorder.stop() {
                    Ok(Some(recording)) => {
                        self.emit(TransportEvent::RecordingFinished(recording));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!("Failed to finish recording: {}", e);
                        self.emit(TransportEvent::RecordingFailed(e.to_string()));
                    }
                }
            } else if self.state.recording_requested {
                recorder.disarm();
            }
        }

        self.state.clear();
        info!("Transport stopped");
        self.notify_step(None);
    }

    /// Replace the pattern. Slots already queued keep their old sound.
    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.state.pattern = pattern;
    }

    /// Advance one step's state in place. Returns the new pattern.
    pub fn cycle_step(&mut self, step: usize) -> Pattern {
        self.state.pattern.cycle(step);
        self.state.pattern
    }

    /// Change tempo. Refused while the transport runs.
    pub fn set_tempo(&mut self, bpm: u32) -> Result<Tempo, TransportError> {
        let tempo = Tempo::new(bpm)?;
        if self.state.playing {
            return Err(TransportError::TempoLocked);
        }
        self.state.tempo = tempo;
        Ok(tempo)
    }

    /// Run a tick if the poll task is due. Returns true if a tick ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.task.take_due(now) {
            return false;
        }
        self.tick();
        if self.state.playing {
            self.task.arm(now);
        }
        true
    }

    /// How long the host loop may wait before the next poll; None while stopped
    pub fn time_until_poll(&self, now: Instant) -> Option<Duration> {
        self.task.time_until_due(now)
    }

    /// One scheduling pass. Returns the number of slots queued.
    pub fn tick(&mut self) -> usize {
        if !self.state.playing {
            return 0;
        }

        let now = self.context.current_time();
        let horizon = now + self.config.schedule_ahead_secs;
        let mut scheduled = 0;

        while self.state.playing && self.state.next_slot_time < horizon {
            let slot = self.state.upcoming_slot();
            let at = self.state.next_slot_time;

            if let Some(accent) = self.state.click_for(slot) {
                self.tone.play_click(&mut self.context, accent, at);
            }
            trace!(
                "slot {:2} at {:.4}s{}",
                slot,
                at,
                if self.state.counting_in { " (count-in)" } else { "" }
            );

            if self.state.advance(slot) {
                self.finish_count_in(now);
            }
            self.notify_step(Some(slot));
            scheduled += 1;
        }

        scheduled
    }

    fn finish_count_in(&mut self, now: f64) {
        self.state.counting_in = false;
        let recording = if std::mem::take(&mut self.state.recording_requested) {
            // next_slot_time already points at the first main slot
            self.begin_recording(self.state.next_slot_time - now)
        } else {
            false
        };
        info!("Count-in complete");
        self.emit(TransportEvent::CountInComplete { recording });
    }

    fn begin_recording(&mut self, lead_in: f64) -> bool {
        let Some(recorder) = self.recorder.as_mut() else {
            return false;
        };
        match recorder.start(lead_in) {
            Ok(()) => {
                self.state.recording = true;
                true
            }
            Err(e) => {
                error!("Failed to start recording: {}", e);
                recorder.disarm();
                self.emit(TransportEvent::RecordingFailed(e.to_string()));
                false
            }
        }
    }

    fn notify_step(&mut self, step: Option<usize>) {
        if let Some(listener) = self.step_listener.as_mut() {
            listener(step);
        }
    }

    fn emit(&mut self, event: TransportEvent) {
        if let Some(listener) = self.event_listener.as_mut() {
            listener(event);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    #[cfg(test)]
    pub fn is_counting_in(&self) -> bool {
        self.state.counting_in
    }

    pub fn is_recording(&self) -> bool {
        self.state.recording
    }

    #[cfg(test)]
    pub fn current_step(&self) -> Option<usize> {
        self.state.current_step
    }

    pub fn count_in_beat(&self) -> Option<usize> {
        self.state.count_in_beat()
    }

    pub fn phase(&self) -> TransportPhase {
        self.state.phase()
    }

    pub fn tempo(&self) -> Tempo {
        self.state.tempo
    }

    pub fn pattern(&self) -> &Pattern {
        &self.state.pattern
    }

    pub fn output_available(&self) -> bool {
        self.context.is_available()
    }
}

impl Drop for LookaheadScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
