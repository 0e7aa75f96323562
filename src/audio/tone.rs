use std::f64::consts::TAU;

use super::context::AudioContext;

pub const ACCENT_FREQUENCY: f32 = 1200.0;
pub const NORMAL_FREQUENCY: f32 = 880.0;
pub const ACCENT_PEAK: f32 = 0.6;
pub const NORMAL_PEAK: f32 = 0.4;

/// Linear attack from silence to peak
pub const ATTACK_SECS: f64 = 0.01;
/// Total click length; the exponential decay fills the time after the attack
pub const CLICK_SECS: f64 = 0.05;
/// Gain the exponential decay reaches at the end of the click
pub const DECAY_FLOOR: f32 = 0.0001;

/// One scheduled sine click, positioned on the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickVoice {
    /// Audio-clock start time in seconds
    pub start: f64,
    pub accent: bool,
    pub frequency: f32,
    pub peak: f32,
}

impl ClickVoice {
    pub fn new(accent: bool, start: f64) -> Self {
        let (frequency, peak) = if accent {
            (ACCENT_FREQUENCY, ACCENT_PEAK)
        } else {
            (NORMAL_FREQUENCY, NORMAL_PEAK)
        };
        Self {
            start,
            accent,
            frequency,
            peak,
        }
    }

    /// Envelope gain `elapsed` seconds after the click starts
    pub fn gain_at(&self, elapsed: f64) -> f32 {
        let peak = self.peak as f64;
        if !(0.0..CLICK_SECS).contains(&elapsed) {
            0.0
        } else if elapsed < ATTACK_SECS {
            (peak * elapsed / ATTACK_SECS) as f32
        } else {
            // v(t) = peak * (floor / peak) ^ ((t - attack) / decay)
            let progress = (elapsed - ATTACK_SECS) / (CLICK_SECS - ATTACK_SECS);
            (peak * (DECAY_FLOOR as f64 / peak).powf(progress)) as f32
        }
    }

    pub fn sample_at(&self, elapsed: f64) -> f32 {
        let gain = self.gain_at(elapsed);
        if gain == 0.0 {
            return 0.0;
        }
        gain * (TAU * self.frequency as f64 * elapsed).sin() as f32
    }
}

/// Synthesizes metronome clicks on the shared audio context.
///
/// Holds no state of its own: every call builds a fresh voice and hands it
/// to the context, which owns the output resource.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToneGenerator;

impl ToneGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Queue a click to start exactly at `at` (audio-clock seconds).
    /// Silent no-op when no output is available.
    pub fn play_click(&self, ctx: &mut AudioContext, accent: bool, at: f64) {
        if !ctx.ensure_unlocked() {
            return;
        }
        let at = at.max(ctx.current_time());
        ctx.submit(ClickVoice::new(accent, at));
    }
}
