use thiserror::Error;

/// All errors produced by tensoraudio-core.
#[derive(Debug, Error)]
pub enum AudioBufferError {
    /// Zero sizes, out-of-range offset/size, or mismatched audio formats.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("audio record is already recording")]
    AlreadyRecording,

    #[error("audio record is not recording")]
    NotRecording,

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AudioBufferError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AudioBufferError>;

/// Validate that `source[offset..offset + size]` lies inside a source of `source_len`.
pub(crate) fn check_slice_bounds(source_len: usize, offset: usize, size: usize) -> Result<()> {
    match offset.checked_add(size) {
        Some(end) if end <= source_len => Ok(()),
        _ => Err(AudioBufferError::invalid(format!(
            "index out of range: offset ({offset}) + size ({size}) should be <= source length ({source_len})"
        ))),
    }
}
