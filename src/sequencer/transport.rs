use super::pattern::{Pattern, STEPS, STEPS_PER_BEAT};
use super::tempo::Tempo;

/// Slots in the fixed one-bar count-in
pub const COUNT_IN_SLOTS: u64 = STEPS as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportPhase {
    Stopped,
    CountingIn,
    Playing,
    /// Playing with a microphone take being captured
    Recording,
}

impl TransportPhase {
    pub fn label(&self) -> &'static str {
        match self {
            TransportPhase::Stopped => "STOP",
            TransportPhase::CountingIn => "COUNT-IN",
            TransportPhase::Playing => "PLAY",
            TransportPhase::Recording => "REC",
        }
    }
}

/// Live state of one play session, owned by the scheduler
#[derive(Debug, Clone)]
pub struct TransportState {
    pub tempo: Tempo,
    pub pattern: Pattern,
    pub playing: bool,
    pub counting_in: bool,
    pub recording: bool,
    /// Recording was asked for and begins when the count-in ends
    pub recording_requested: bool,
    /// None until the first slot of a session has been scheduled
    pub current_step: Option<usize>,
    /// Audio-clock time of the next slot, in seconds
    pub next_slot_time: f64,
    pub slots_played: u64,
}

impl TransportState {
    pub fn new(tempo: Tempo, pattern: Pattern) -> Self {
        Self {
            tempo,
            pattern,
            playing: false,
            counting_in: false,
            recording: false,
            recording_requested: false,
            current_step: None,
            next_slot_time: 0.0,
            slots_played: 0,
        }
    }

    /// Begin a new session whose first slot sounds at `first_slot_time`
    pub fn reset(&mut self, first_slot_time: f64, count_in: bool, record: bool) {
        self.playing = true;
        self.counting_in = count_in;
        self.recording = false;
        self.recording_requested = record;
        self.current_step = None;
        self.next_slot_time = first_slot_time;
        self.slots_played = 0;
    }

    pub fn clear(&mut self) {
        self.playing = false;
        self.counting_in = false;
        self.recording = false;
        self.recording_requested = false;
        self.current_step = None;
    }

    /// Index of the slot about to be scheduled
    pub fn upcoming_slot(&self) -> usize {
        self.current_step.map_or(0, |step| (step + 1) % STEPS)
    }

    /// What the upcoming slot should sound: Some(accent) or None for silence.
    /// The count-in clicks an accent on every quarter note regardless of the pattern.
    pub fn click_for(&self, slot: usize) -> Option<bool> {
        if self.counting_in {
            (slot % STEPS_PER_BEAT == 0).then_some(true)
        } else {
            self.pattern.get(slot).click()
        }
    }

    /// Record that `slot` was scheduled and move the slot clock forward.
    /// Returns true when this slot completed the count-in.
    pub fn advance(&mut self, slot: usize) -> bool {
        self.current_step = Some(slot);
        self.slots_played += 1;
        self.next_slot_time += self.tempo.seconds_per_slot();
        self.counting_in && self.slots_played >= COUNT_IN_SLOTS
    }

    pub fn phase(&self) -> TransportPhase {
        if !self.playing {
            TransportPhase::Stopped
        } else if self.counting_in {
            TransportPhase::CountingIn
        } else if self.recording {
            TransportPhase::Recording
        } else {
            TransportPhase::Playing
        }
    }

    /// Quarter-note number (1..=4) of the latest count-in slot
    pub fn count_in_beat(&self) -> Option<usize> {
        if !self.counting_in {
            return None;
        }
        self.current_step.map(|step| step / STEPS_PER_BEAT + 1)
    }
}
