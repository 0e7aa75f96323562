use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Number of 16th-note slots in one 4/4 bar
pub const STEPS: usize = 16;

/// Slots per quarter note
pub const STEPS_PER_BEAT: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeatState {
    #[default]
    Off,
    Normal,
    Accent,
}

impl BeatState {
    /// Next state in the Off -> Normal -> Accent -> Off cycle
    pub fn next(self) -> Self {
        match self {
            BeatState::Off => BeatState::Normal,
            BeatState::Normal => BeatState::Accent,
            BeatState::Accent => BeatState::Off,
        }
    }

    /// Whether this step produces a click, and if so whether it is accented
    pub fn click(self) -> Option<bool> {
        match self {
            BeatState::Off => None,
            BeatState::Normal => Some(false),
            BeatState::Accent => Some(true),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BeatState::Off => "Off",
            BeatState::Normal => "Normal",
            BeatState::Accent => "Accent",
        }
    }
}

impl fmt::Display for BeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One bar of 16th-note steps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    steps: [BeatState; STEPS],
}

impl Pattern {
    /// An all-off pattern
    pub fn new() -> Self {
        Self {
            steps: [BeatState::Off; STEPS],
        }
    }

    pub const fn from_steps(steps: [BeatState; STEPS]) -> Self {
        Self { steps }
    }

    /// Build a pattern from an arbitrary slice. Anything but exactly 16 steps is rejected.
    pub fn from_slice(steps: &[BeatState]) -> Result<Self, TransportError> {
        let steps: [BeatState; STEPS] = steps
            .try_into()
            .map_err(|_| TransportError::InvalidPattern(steps.len()))?;
        Ok(Self { steps })
    }

    /// Step state; indices wrap modulo 16
    pub fn get(&self, step: usize) -> BeatState {
        self.steps[step % STEPS]
    }

    #[cfg(test)]
    pub fn set(&mut self, step: usize, state: BeatState) {
        if step < STEPS {
            self.steps[step] = state;
        }
    }

    /// Advance a step to its next state. Returns the new state.
    pub fn cycle(&mut self, step: usize) -> BeatState {
        if step < STEPS {
            self.steps[step] = self.steps[step].next();
            self.steps[step]
        } else {
            BeatState::Off
        }
    }

    /// Returns true if any step produces a click
    pub fn has_content(&self) -> bool {
        self.steps.iter().any(|s| *s != BeatState::Off)
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<Vec<BeatState>> for Pattern {
    type Error = TransportError;

    fn try_from(steps: Vec<BeatState>) -> Result<Self, Self::Error> {
        Self::from_slice(&steps)
    }
}
