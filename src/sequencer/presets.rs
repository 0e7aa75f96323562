use super::pattern::{BeatState, Pattern};

use BeatState::{Accent as A, Normal as N, Off as O};

/// A named built-in pattern
pub struct Preset {
    pub name: &'static str,
    pub pattern: Pattern,
}

pub const DEFAULT_PRESET: &str = "Four on the Floor";

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "Clear",
        pattern: Pattern::from_steps([O; 16]),
    },
    Preset {
        name: "All Beats On",
        pattern: Pattern::from_steps([N; 16]),
    },
    Preset {
        name: "Four on the Floor",
        pattern: Pattern::from_steps([A, N, N, N, A, N, N, N, A, N, N, N, A, N, N, N]),
    },
    Preset {
        name: "Classic Backbeat",
        pattern: Pattern::from_steps([O, O, O, O, A, O, O, O, O, O, O, O, A, O, O, O]),
    },
    Preset {
        name: "Shuffle / Swing",
        pattern: Pattern::from_steps([A, O, N, A, O, N, A, O, N, A, O, N, A, O, N, A]),
    },
    Preset {
        name: "Jazz Ride",
        pattern: Pattern::from_steps([A, O, N, O, N, O, O, O, A, O, N, O, N, O, O, O]),
    },
    Preset {
        name: "Boom Bap (Hip-Hop)",
        pattern: Pattern::from_steps([A, O, O, O, N, O, A, O, A, O, O, O, N, O, A, O]),
    },
    Preset {
        name: "Trap (808)",
        pattern: Pattern::from_steps([A, N, N, N, N, N, O, N, N, N, N, O, A, N, N, O]),
    },
    Preset {
        name: "Funk Syncopation",
        pattern: Pattern::from_steps([A, O, O, N, O, N, O, N, A, O, O, N, O, N, O, O]),
    },
    Preset {
        name: "3-2 Son Clave",
        pattern: Pattern::from_steps([A, O, O, O, O, O, N, O, O, O, O, O, A, O, N, O]),
    },
    Preset {
        name: "Bossa Nova",
        pattern: Pattern::from_steps([A, O, O, N, O, O, O, N, A, O, O, O, N, O, O, N]),
    },
    Preset {
        name: "Reggae One Drop",
        pattern: Pattern::from_steps([O, N, O, N, O, N, A, N, O, N, O, N, O, N, A, N]),
    },
];

/// Look up a preset index by name (case-insensitive)
pub fn find_preset(name: &str) -> Option<usize> {
    PRESETS
        .iter()
        .position(|p| p.name.eq_ignore_ascii_case(name))
}

/// Index of the default preset
pub fn default_preset() -> usize {
    find_preset(DEFAULT_PRESET).unwrap_or(0)
}
