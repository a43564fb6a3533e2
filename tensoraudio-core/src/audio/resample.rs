//! Sample-rate conversion of interleaved audio using a rubato `FastFixedIn`
//! resampler.
//!
//! ## Design
//!
//! Input devices usually capture at their native rate (commonly 48 kHz),
//! while an audio model wants a fixed rate such as 16 kHz. `RateConverter`
//! bridges that gap on the pump thread, where allocation is allowed.
//!
//! When capture rate == target rate, `RateConverter` is a passthrough and no
//! rubato session is created.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use crate::error::{AudioBufferError, Result};

/// Converts interleaved f32 audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when capture rate == target rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    channels: usize,
    /// Per-channel accumulation — holds partial input frames between calls.
    input_buf: Vec<Vec<f32>>,
    /// Input frames rubato expects per process call.
    chunk_size: usize,
    /// Pre-allocated output buffer: `[channels][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// Create a new converter.
    ///
    /// # Parameters
    /// - `capture_rate`: Sample rate of the incoming audio (Hz).
    /// - `target_rate`: Sample rate expected downstream (Hz).
    /// - `channels`: Interleaved channel count.
    /// - `chunk_size`: Input frames per rubato call (e.g. `960`).
    ///
    /// # Errors
    /// `InvalidArgument` for zero rates/channels/chunk size, `AudioDevice` if rubato
    /// fails to initialise.
    pub fn new(
        capture_rate: u32,
        target_rate: u32,
        channels: usize,
        chunk_size: usize,
    ) -> Result<Self> {
        if channels == 0 || chunk_size == 0 {
            return Err(AudioBufferError::invalid(
                "resampler channels and chunk size must be greater than 0",
            ));
        }

        if capture_rate == 0 || target_rate == 0 {
            return Err(AudioBufferError::invalid(format!(
                "sample rates must be greater than 0 (capture {capture_rate}, target {target_rate})"
            )));
        }

        if capture_rate == target_rate {
            return Ok(Self {
                resampler: None,
                channels,
                input_buf: Vec::new(),
                chunk_size,
                output_buf: Vec::new(),
            });
        }

        let ratio = target_rate as f64 / capture_rate as f64;

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio
            PolynomialDegree::Cubic,
            chunk_size,
            channels,
        )
        .map_err(|e| AudioBufferError::AudioDevice(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();

        tracing::info!(
            capture_rate,
            target_rate,
            channels,
            chunk_size,
            max_out,
            "resampling enabled"
        );

        Ok(Self {
            resampler: Some(resampler),
            channels,
            input_buf: vec![Vec::with_capacity(chunk_size * 2); channels],
            chunk_size,
            output_buf: vec![vec![0f32; max_out]; channels],
        })
    }

    /// Process interleaved samples, returning interleaved output (may be empty).
    ///
    /// Frames accumulate internally until a full `chunk_size` block is
    /// available. A trailing partial frame in `samples` is ignored.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            return samples.to_vec();
        };

        for frame in samples.chunks_exact(self.channels) {
            for (ch, sample) in frame.iter().enumerate() {
                self.input_buf[ch].push(*sample);
            }
        }

        let mut result = Vec::new();

        while self.input_buf[0].len() >= self.chunk_size {
            let inputs: Vec<&[f32]> = self
                .input_buf
                .iter()
                .map(|ch| &ch[..self.chunk_size])
                .collect();

            match resampler.process_into_buffer(&inputs, &mut self.output_buf, None) {
                Ok((_consumed, produced)) => {
                    result.reserve(produced * self.channels);
                    for frame in 0..produced {
                        for ch in 0..self.channels {
                            result.push(self.output_buf[ch][frame]);
                        }
                    }
                }
                Err(e) => {
                    error!("resampler process error: {e}");
                }
            }

            for ch in &mut self.input_buf {
                ch.drain(..self.chunk_size);
            }
        }

        result
    }

    /// Returns `true` when capture rate == target rate.
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}
