//! `AudioTensor` — fixed-size sliding window of the most recent samples a
//! model consumes.
//!
//! ## Algorithm
//!
//! Every load shifts the window left by the number of incoming samples and
//! copies them into the tail, so index `buffer_size - 1` always holds the
//! newest sample. A load larger than the window keeps only its most recent
//! `buffer_size` samples and discards all prior content.

pub mod wav;

use tracing::trace;

use crate::{
    audio::{capture::i16_to_f32, format::AudioFormat},
    buffering::FloatBuffer,
    error::{check_slice_bounds, AudioBufferError, Result},
};

/// A producer of interleaved samples with a known format, such as
/// [`crate::record::AudioRecord`].
pub trait AudioSource {
    fn format(&self) -> AudioFormat;

    /// Copy of every sample currently held, oldest-first.
    fn available_samples(&self) -> Vec<f32>;
}

/// Model input window holding `sample_count * channel_count` interleaved
/// samples, oldest-to-newest.
#[derive(Debug, Clone)]
pub struct AudioTensor {
    format: AudioFormat,
    buffer: FloatBuffer,
}

impl AudioTensor {
    /// Create a zero-filled window of `sample_count` frames.
    ///
    /// # Errors
    /// `InvalidArgument` if `sample_count == 0`.
    pub fn new(format: AudioFormat, sample_count: usize) -> Result<Self> {
        if sample_count == 0 {
            return Err(AudioBufferError::invalid("sample count must be greater than 0"));
        }
        let buffer_size = format.samples_for_frames(sample_count)?;
        Ok(Self {
            format,
            buffer: FloatBuffer::new(buffer_size)?,
        })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Window length in interleaved samples.
    pub fn buffer_size(&self) -> usize {
        self.buffer.size()
    }

    /// Window length in frames.
    pub fn sample_count(&self) -> usize {
        self.buffer.size() / usize::from(self.format.channel_count())
    }

    /// Read-only view of the window, oldest-to-newest.
    pub fn buffer(&self) -> &FloatBuffer {
        &self.buffer
    }

    /// Owned copy of the window for handing to an inference stage.
    pub fn to_vec(&self) -> Vec<f32> {
        self.buffer.data().to_vec()
    }

    /// Append everything `source` currently holds.
    ///
    /// # Errors
    /// `InvalidArgument` if the source format differs from this tensor's.
    pub fn load_source<S: AudioSource + ?Sized>(&mut self, source: &S) -> Result<()> {
        self.format.ensure_compatible(&source.format())?;
        let samples = source.available_samples();
        self.load(&samples, 0, samples.len())
    }

    /// Append `source[offset..offset + size]`, shifting out the oldest samples.
    ///
    /// Multi-channel input must be interleaved.
    ///
    /// # Errors
    /// `InvalidArgument` if the slice falls outside `source`; the window is
    /// left untouched.
    pub fn load(&mut self, source: &[f32], offset: usize, size: usize) -> Result<()> {
        check_slice_bounds(source.len(), offset, size)?;
        if size == 0 {
            return Ok(());
        }

        let buffer_size = self.buffer_size();
        let (offset, size) = if size > buffer_size {
            (offset + (size - buffer_size), buffer_size)
        } else {
            (offset, size)
        };

        let window = self.buffer.data_mut();
        window.copy_within(size.., 0);
        window[buffer_size - size..].copy_from_slice(&source[offset..offset + size]);
        trace!(size, buffer_size, "audio tensor load");
        Ok(())
    }

    /// Convenience for loading a whole slice.
    pub fn load_all(&mut self, source: &[f32]) -> Result<()> {
        self.load(source, 0, source.len())
    }

    /// Append 16-bit PCM samples, scaled to [-1, 1] by `i16::MAX`.
    ///
    /// # Errors
    /// `InvalidArgument` if the slice falls outside `source`.
    pub fn load_pcm16(&mut self, source: &[i16], offset: usize, size: usize) -> Result<()> {
        check_slice_bounds(source.len(), offset, size)?;
        let converted: Vec<f32> = source[offset..offset + size]
            .iter()
            .map(|s| i16_to_f32(*s))
            .collect();
        self.load_all(&converted)
    }

    /// Zero the window.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// The window as a `[1, buffer_size]` model input array.
    #[cfg(feature = "ndarray")]
    pub fn to_array(&self) -> Result<ndarray::Array2<f32>> {
        ndarray::Array2::from_shape_vec((1, self.buffer_size()), self.to_vec())
            .map_err(|e| AudioBufferError::Other(e.into()))
    }
}
