use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use log::{error, info};
use parking_lot::Mutex;

use crate::error::RecorderError;

/// A finished microphone take
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub path: PathBuf,
    pub duration_secs: f32,
    pub frames: usize,
}

/// Microphone capture tied to the transport.
///
/// `arm` acquires the input (and is where permission is refused), `start`
/// begins keeping audio, `stop` finalizes the take. `disarm` releases an
/// armed input that never started.
pub trait Recorder {
    fn arm(&mut self) -> Result<(), RecorderError>;

    /// Begin capturing. `lead_in` is how many seconds ahead of now the first
    /// recorded beat sounds; audio before it is discarded.
    fn start(&mut self, lead_in: f64) -> Result<(), RecorderError>;

    /// Returns None when capture never started
    fn stop(&mut self) -> Result<Option<Recording>, RecorderError>;

    fn disarm(&mut self);
}

struct CaptureSession {
    _stream: Stream,
    buffer: Arc<Mutex<Vec<f32>>>,
    capturing: Arc<AtomicBool>,
    sample_rate: u32,
    channels: u16,
    skip_frames: usize,
}

/// Records the default input device into numbered WAV takes
pub struct MicRecorder {
    output_dir: PathBuf,
    session: Option<CaptureSession>,
}

impl MicRecorder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            session: None,
        }
    }

    fn open_input() -> Result<CaptureSession, RecorderError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| RecorderError::PermissionDenied("no input device available".into()))?;

        let config = device
            .default_input_config()
            .map_err(|e| RecorderError::PermissionDenied(e.to_string()))?;
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let capturing = Arc::new(AtomicBool::new(false));
        let stream_config: StreamConfig = config.clone().into();

        let stream = match config.sample_format() {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &stream_config, buffer.clone(), capturing.clone())
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &stream_config, buffer.clone(), capturing.clone())
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &stream_config, buffer.clone(), capturing.clone())
            }
            format => {
                return Err(RecorderError::PermissionDenied(format!(
                    "unsupported input sample format: {:?}",
                    format
                )))
            }
        }?;

        stream
            .play()
            .map_err(|e| RecorderError::PermissionDenied(e.to_string()))?;

        Ok(CaptureSession {
            _stream: stream,
            buffer,
            capturing,
            sample_rate: stream_config.sample_rate.0,
            channels: stream_config.channels,
            skip_frames: 0,
        })
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        buffer: Arc<Mutex<Vec<f32>>>,
        capturing: Arc<AtomicBool>,
    ) -> Result<Stream, RecorderError>
    where
        T: cpal::SizedSample,
        f32: cpal::FromSample<T>,
    {
        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if !capturing.load(Ordering::Acquire) {
                        return;
                    }
                    let mut buffer = buffer.lock();
                    buffer.extend(data.iter().map(|s| <f32 as cpal::FromSample<T>>::from_sample_(*s)));
                },
                |err| {
                    error!("Input stream error: {}", err);
                },
                None,
            )
            .map_err(|e| RecorderError::PermissionDenied(e.to_string()))
    }
}

impl Recorder for MicRecorder {
    fn arm(&mut self) -> Result<(), RecorderError> {
        if self.session.is_none() {
            self.session = Some(Self::open_input()?);
            info!("Microphone armed");
        }
        Ok(())
    }

    fn start(&mut self, lead_in: f64) -> Result<(), RecorderError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| RecorderError::PermissionDenied("microphone is not armed".into()))?;
        session.skip_frames = (lead_in.max(0.0) * session.sample_rate as f64).round() as usize;
        session.buffer.lock().clear();
        session.capturing.store(true, Ordering::Release);
        info!("Recording started ({:.3}s lead-in)", lead_in);
        Ok(())
    }

    fn stop(&mut self) -> Result<Option<Recording>, RecorderError> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };
        if !session.capturing.swap(false, Ordering::AcqRel) {
            return Ok(None);
        }
        let samples = std::mem::take(&mut *session.buffer.lock());
        let (sample_rate, channels, skip_frames) =
            (session.sample_rate, session.channels, session.skip_frames);
        // Dropping the session closes the input stream
        drop(session);

        let path = next_take_path(&self.output_dir)?;
        let take = trim_lead_in(&samples, skip_frames, channels);
        let recording = write_take(&path, take, channels, sample_rate)?;
        info!(
            "Recording saved: {} ({:.1}s)",
            recording.path.display(),
            recording.duration_secs
        );
        Ok(Some(recording))
    }

    fn disarm(&mut self) {
        if self.session.take().is_some() {
            info!("Microphone released");
        }
    }
}

/// First unused `take-NNN.wav` in `dir`, creating the directory if needed
pub fn next_take_path(dir: &Path) -> Result<PathBuf, RecorderError> {
    std::fs::create_dir_all(dir)?;
    let mut n = 1;
    loop {
        let path = dir.join(format!("take-{:03}.wav", n));
        if !path.exists() {
            return Ok(path);
        }
        n += 1;
    }
}

/// Drop the first `skip_frames` frames of interleaved audio, captured before the first beat
pub fn trim_lead_in(samples: &[f32], skip_frames: usize, channels: u16) -> &[f32] {
    let skip = skip_frames
        .saturating_mul(channels.max(1) as usize)
        .min(samples.len());
    &samples[skip..]
}

/// Write interleaved float samples as 16-bit PCM
pub fn write_take(
    path: &Path,
    samples: &[f32],
    channels: u16,
    sample_rate: u32,
) -> Result<Recording, RecorderError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in samples {
        let s = (*sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(s)?;
    }
    writer.finalize()?;

    let frames = samples.len() / channels.max(1) as usize;
    Ok(Recording {
        path: path.to_path_buf(),
        duration_secs: frames as f32 / sample_rate as f32,
        frames,
    })
}
