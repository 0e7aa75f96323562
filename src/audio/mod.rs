pub mod context;
pub mod engine;
pub mod recorder;
#[cfg(test)]
pub mod testing;
pub mod tone;

pub use context::AudioContext;
pub use engine::CpalBackend;
pub use recorder::{MicRecorder, Recorder, Recording};
pub use tone::ToneGenerator;
