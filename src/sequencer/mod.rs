pub mod pattern;
pub mod presets;
pub mod scheduler;
pub mod task;
pub mod tempo;
pub mod transport;

pub use pattern::{BeatState, Pattern, STEPS, STEPS_PER_BEAT};
pub use presets::{default_preset, find_preset, DEFAULT_PRESET, PRESETS};
pub use scheduler::{LookaheadScheduler, TransportEvent};
pub use tempo::{Tempo, DEFAULT_BPM};
pub use transport::TransportPhase;
