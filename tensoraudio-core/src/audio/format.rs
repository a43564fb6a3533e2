//! Audio format descriptor shared by producers and consumers of samples.

use serde::{Deserialize, Serialize};

use crate::error::{AudioBufferError, Result};

/// Channel count and sample rate of an interleaved f32 sample stream.
///
/// Two formats are compatible exactly when they compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawAudioFormat")]
pub struct AudioFormat {
    channel_count: u16,
    sample_rate: u32,
}

impl AudioFormat {
    pub const DEFAULT_CHANNEL_COUNT: u16 = 1;

    /// # Errors
    /// `InvalidArgument` if either field is zero.
    pub fn new(channel_count: u16, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(AudioBufferError::invalid("channel count must be greater than 0"));
        }
        if sample_rate == 0 {
            return Err(AudioBufferError::invalid("sample rate must be greater than 0"));
        }
        Ok(Self {
            channel_count,
            sample_rate,
        })
    }

    /// Single-channel format at `sample_rate`.
    pub fn mono(sample_rate: u32) -> Result<Self> {
        Self::new(Self::DEFAULT_CHANNEL_COUNT, sample_rate)
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved element count for `frames` frames.
    ///
    /// # Errors
    /// `InvalidArgument` if the count overflows `usize`.
    pub fn samples_for_frames(&self, frames: usize) -> Result<usize> {
        frames
            .checked_mul(usize::from(self.channel_count))
            .ok_or_else(|| {
                AudioBufferError::invalid(format!(
                    "{frames} frames of {} channel(s) overflow the sample count",
                    self.channel_count
                ))
            })
    }

    /// Fail with `InvalidArgument` unless `other` equals this format.
    pub fn ensure_compatible(&self, other: &AudioFormat) -> Result<()> {
        if self == other {
            return Ok(());
        }
        Err(AudioBufferError::invalid(format!(
            "incompatible audio format: expected {} channel(s) at {} Hz, got {} channel(s) at {} Hz",
            self.channel_count, self.sample_rate, other.channel_count, other.sample_rate
        )))
    }
}

impl Default for AudioFormat {
    /// Mono at 16 kHz, the rate most on-device speech and audio models expect.
    fn default() -> Self {
        Self {
            channel_count: Self::DEFAULT_CHANNEL_COUNT,
            sample_rate: 16_000,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAudioFormat {
    channel_count: u16,
    sample_rate: u32,
}

impl TryFrom<RawAudioFormat> for AudioFormat {
    type Error = AudioBufferError;

    fn try_from(raw: RawAudioFormat) -> Result<Self> {
        Self::new(raw.channel_count, raw.sample_rate)
    }
}
