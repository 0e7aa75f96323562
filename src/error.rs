use thiserror::Error;

/// Rejections at the transport API boundary. The previous configuration stays in effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport is already running")]
    AlreadyRunning,

    #[error("tempo {0} BPM is outside 30..=240")]
    InvalidTempo(u32),

    #[error("pattern must have exactly 16 steps, got {0}")]
    InvalidPattern(usize),

    #[error("tempo cannot change while the transport is running")]
    TempoLocked,

    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("no recorder is configured")]
    RecorderMissing,

    #[error("recorder failed: {0}")]
    Recorder(String),
}

/// Failures of the microphone capture collaborator
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),

    #[error("recording I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write WAV take: {0}")]
    Wav(#[from] hound::Error),
}

impl From<RecorderError> for TransportError {
    fn from(err: RecorderError) -> Self {
        match err {
            RecorderError::PermissionDenied(reason) => TransportError::PermissionDenied(reason),
            other => TransportError::Recorder(other.to_string()),
        }
    }
}
