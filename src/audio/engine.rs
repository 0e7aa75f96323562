use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, error, info};

use super::context::{AudioBackend, BackendFactory, ContextState};
use super::tone::{ClickVoice, CLICK_SECS};

/// Messages from the scheduler to the audio thread
#[derive(Debug, Clone, Copy)]
pub enum VoiceMessage {
    Play(ClickVoice),
    /// Drop voices that have not started by this audio-clock time
    CancelFrom(f64),
}

struct ActiveVoice {
    voice: ClickVoice,
    start_frame: u64,
    end_frame: u64,
}

/// Sample-accurate click renderer run inside the output callback.
///
/// The mixer's frame counter is the audio clock: a voice due at `t` seconds
/// starts on frame `round(t * sample_rate)`.
pub struct ClickMixer {
    sample_rate: f64,
    frame: u64,
    voices: Vec<ActiveVoice>,
}

impl ClickMixer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate: sample_rate as f64,
            frame: 0,
            voices: Vec::with_capacity(64),
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn time_to_frame(&self, time: f64) -> u64 {
        (time.max(0.0) * self.sample_rate).round() as u64
    }

    pub fn handle(&mut self, msg: VoiceMessage) {
        match msg {
            VoiceMessage::Play(voice) => {
                // Late voices start immediately instead of being skipped
                let start_frame = self.time_to_frame(voice.start).max(self.frame);
                let length = (CLICK_SECS * self.sample_rate).ceil() as u64;
                self.voices.push(ActiveVoice {
                    voice,
                    start_frame,
                    end_frame: start_frame + length,
                });
            }
            VoiceMessage::CancelFrom(time) => {
                let cutoff = self.time_to_frame(time).max(self.frame);
                self.voices.retain(|v| v.start_frame < cutoff);
            }
        }
    }

    /// Render one mono sample and advance the clock by one frame
    pub fn next_sample(&mut self) -> f32 {
        let frame = self.frame;
        self.frame += 1;

        let mut out = 0.0f32;
        for active in &self.voices {
            if frame >= active.start_frame && frame < active.end_frame {
                let elapsed = (frame - active.start_frame) as f64 / self.sample_rate;
                out += active.voice.sample_at(elapsed);
            }
        }
        out
    }

    /// Forget voices that have finished playing
    pub fn prune(&mut self) {
        let frame = self.frame;
        self.voices.retain(|v| v.end_frame > frame);
    }

    #[cfg(test)]
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }
}

/// Output backend on the default cpal device
pub struct CpalBackend {
    stream: Stream,
    tx: Sender<VoiceMessage>,
    frames: Arc<AtomicU64>,
    sample_rate: f64,
    state: ContextState,
}

impl CpalBackend {
    /// Open the default output device. The stream starts suspended.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No output device available")?;

        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate().0 as f64;
        let (tx, rx) = bounded(256);
        let frames = Arc::new(AtomicU64::new(0));

        let stream = match config.sample_format() {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), rx, frames.clone())?
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), rx, frames.clone())?
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), rx, frames.clone())?
            }
            format => anyhow::bail!("Unsupported sample format: {:?}", format),
        };

        // Some hosts start streams on creation
        if let Err(e) = stream.pause() {
            debug!("Could not pause new output stream: {}", e);
        }

        info!(
            "Output device: {} @ {} Hz",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate
        );

        Ok(Self {
            stream,
            tx,
            frames,
            sample_rate,
            state: ContextState::Suspended,
        })
    }

    /// Factory for `AudioContext::new`; the device is opened on first use
    pub fn factory() -> BackendFactory {
        Box::new(|| Ok(Box::new(CpalBackend::new()?) as Box<dyn AudioBackend>))
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        rx: Receiver<VoiceMessage>,
        frames: Arc<AtomicU64>,
    ) -> Result<Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let mut mixer = ClickMixer::new(config.sample_rate.0 as f32);

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                while let Ok(msg) = rx.try_recv() {
                    mixer.handle(msg);
                }

                for frame in data.chunks_mut(channels) {
                    let sample = T::from_sample(soft_clip(mixer.next_sample()));
                    for channel_sample in frame.iter_mut() {
                        *channel_sample = sample;
                    }
                }

                mixer.prune();
                frames.store(mixer.frame(), Ordering::Release);
            },
            |err| {
                error!("Audio stream error: {}", err);
            },
            None,
        )?;

        Ok(stream)
    }

    fn send(&self, msg: VoiceMessage) -> Result<()> {
        match self.tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => anyhow::bail!("voice queue full"),
            Err(TrySendError::Disconnected(_)) => anyhow::bail!("audio thread is gone"),
        }
    }
}

impl AudioBackend for CpalBackend {
    fn current_time(&self) -> f64 {
        self.frames.load(Ordering::Acquire) as f64 / self.sample_rate
    }

    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<()> {
        self.stream.play().context("Failed to start output stream")?;
        self.state = ContextState::Running;
        Ok(())
    }

    fn submit(&mut self, voice: ClickVoice) -> Result<()> {
        self.send(VoiceMessage::Play(voice))
    }

    fn cancel_from(&mut self, time: f64) -> Result<()> {
        self.send(VoiceMessage::CancelFrom(time))
    }
}

/// Soft clipping function to prevent harsh digital clipping
fn soft_clip(x: f32) -> f32 {
    if x > 1.0 {
        1.0 - (-x + 1.0).exp() * 0.5
    } else if x < -1.0 {
        -1.0 + (x + 1.0).exp() * 0.5
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: f32 = 1000.0;

    fn render(mixer: &mut ClickMixer, frames: usize) -> Vec<f32> {
        (0..frames).map(|_| mixer.next_sample()).collect()
    }

    #[test]
    fn voice_starts_on_its_frame() {
        let mut mixer = ClickMixer::new(RATE);
        mixer.handle(VoiceMessage::Play(ClickVoice::new(true, 0.1)));

        let out = render(&mut mixer, 200);
        assert!(out[..100].iter().all(|s| *s == 0.0));
        assert!(out[100..150].iter().any(|s| s.abs() > 0.1));
        assert!(out[150..].iter().all(|s| *s == 0.0));

        mixer.prune();
        assert_eq!(mixer.active_voices(), 0);
        assert_eq!(mixer.frame(), 200);
    }

    #[test]
    fn late_voice_starts_now() {
        let mut mixer = ClickMixer::new(RATE);
        render(&mut mixer, 300);
        mixer.handle(VoiceMessage::Play(ClickVoice::new(false, 0.1)));
        let out = render(&mut mixer, 50);
        assert!(out.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn cancel_drops_unstarted_voices_only() {
        let mut mixer = ClickMixer::new(RATE);
        mixer.handle(VoiceMessage::Play(ClickVoice::new(true, 0.0)));
        mixer.handle(VoiceMessage::Play(ClickVoice::new(true, 0.5)));
        mixer.handle(VoiceMessage::Play(ClickVoice::new(false, 0.75)));
        render(&mut mixer, 10);

        mixer.handle(VoiceMessage::CancelFrom(0.01));
        assert_eq!(mixer.active_voices(), 1);

        let out = render(&mut mixer, 990);
        assert!(out[490..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn soft_clip_bounds_output() {
        assert_eq!(soft_clip(0.5), 0.5);
        assert!(soft_clip(4.0) < 1.0);
        assert!(soft_clip(-4.0) > -1.0);
    }
}
