use std::fmt;

use serde::{Deserialize, Serialize};

use super::pattern::STEPS_PER_BEAT;
use crate::error::TransportError;

pub const MIN_BPM: u32 = 30;
pub const MAX_BPM: u32 = 240;
pub const DEFAULT_BPM: u32 = 60;

/// Tempo in whole beats per minute, always within [MIN_BPM, MAX_BPM]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Tempo(u32);

impl Tempo {
    pub fn new(bpm: u32) -> Result<Self, TransportError> {
        if (MIN_BPM..=MAX_BPM).contains(&bpm) {
            Ok(Self(bpm))
        } else {
            Err(TransportError::InvalidTempo(bpm))
        }
    }

    pub fn bpm(&self) -> u32 {
        self.0
    }

    /// Duration of one 16th-note slot.
    /// 1 beat = 4 slots, seconds_per_beat = 60 / bpm
    pub fn seconds_per_slot(&self) -> f64 {
        60.0 / self.0 as f64 / STEPS_PER_BEAT as f64
    }

    /// Nudge by a signed amount, clamped into the valid range
    pub fn offset(&self, delta: i32) -> Self {
        let bpm = (self.0 as i64 + delta as i64).clamp(MIN_BPM as i64, MAX_BPM as i64);
        Self(bpm as u32)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(DEFAULT_BPM)
    }
}

impl TryFrom<u32> for Tempo {
    type Error = TransportError;

    fn try_from(bpm: u32) -> Result<Self, Self::Error> {
        Self::new(bpm)
    }
}

impl From<Tempo> for u32 {
    fn from(tempo: Tempo) -> u32 {
        tempo.0
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive() {
        assert!(Tempo::new(30).is_ok());
        assert!(Tempo::new(240).is_ok());
        assert_eq!(Tempo::new(29), Err(TransportError::InvalidTempo(29)));
        assert_eq!(Tempo::new(241), Err(TransportError::InvalidTempo(241)));
    }

    #[test]
    fn slot_is_a_sixteenth_note() {
        assert!((Tempo::new(120).unwrap().seconds_per_slot() - 0.125).abs() < 1e-12);
        assert!((Tempo::new(60).unwrap().seconds_per_slot() - 0.25).abs() < 1e-12);
        assert!((Tempo::new(30).unwrap().seconds_per_slot() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn offset_clamps() {
        let tempo = Tempo::new(235).unwrap();
        assert_eq!(tempo.offset(10).bpm(), MAX_BPM);
        assert_eq!(Tempo::new(32).unwrap().offset(-5).bpm(), MIN_BPM);
        assert_eq!(tempo.offset(-5).bpm(), 230);
    }

    #[test]
    fn deserialization_validates() {
        let tempo: Tempo = serde_json::from_str("90").unwrap();
        assert_eq!(tempo.bpm(), 90);
        assert!(serde_json::from_str::<Tempo>("500").is_err());
    }
}
