use crate::sequencer::PRESETS;

/// Requests from the UI to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // Transport
    TogglePlay,
    Stop,
    /// Start with count-in and microphone capture
    Record,

    // Configuration
    SetBpm(u32),
    CycleStep(usize),
    LoadPreset(usize),
}

impl Command {
    /// Commands that only make sense while the transport is stopped
    pub fn requires_stopped(&self) -> bool {
        matches!(self, Command::SetBpm(_) | Command::LoadPreset(_))
    }

    /// Human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::TogglePlay => "Toggle play".to_string(),
            Command::Stop => "Stop".to_string(),
            Command::Record => "Record".to_string(),
            Command::SetBpm(bpm) => format!("Set BPM to {}", bpm),
            Command::CycleStep(step) => format!("Cycle step {}", step + 1),
            Command::LoadPreset(index) => match PRESETS.get(*index) {
                Some(preset) => format!("Load preset '{}'", preset.name),
                None => format!("Load preset {}", index),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptions() {
        assert_eq!(Command::SetBpm(90).description(), "Set BPM to 90");
        assert_eq!(Command::CycleStep(0).description(), "Cycle step 1");
        assert_eq!(
            Command::LoadPreset(2).description(),
            "Load preset 'Four on the Floor'"
        );
        assert_eq!(Command::LoadPreset(99).description(), "Load preset 99");
    }

    #[test]
    fn configuration_is_gated() {
        assert!(Command::SetBpm(100).requires_stopped());
        assert!(Command::LoadPreset(0).requires_stopped());
        assert!(!Command::CycleStep(3).requires_stopped());
        assert!(!Command::Stop.requires_stopped());
    }
}
