//! Owned, fixed-length block of f32 samples.

use crate::error::{AudioBufferError, Result};

/// A contiguous block of f32 samples whose length never changes.
///
/// Always owns its storage: construction from a slice copies, `Clone`
/// duplicates. Nothing hands out aliased storage.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatBuffer {
    data: Vec<f32>,
}

impl FloatBuffer {
    /// Create a zero-filled buffer of `size` floats.
    ///
    /// # Errors
    /// `InvalidArgument` if `size == 0`.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(AudioBufferError::invalid("float buffer size must be greater than 0"));
        }
        Ok(Self {
            data: vec![0.0; size],
        })
    }

    /// Copy the first `size` floats of `source` into a new buffer.
    ///
    /// # Errors
    /// `InvalidArgument` if `size == 0` or `size > source.len()`.
    pub fn from_slice(source: &[f32], size: usize) -> Result<Self> {
        if size == 0 {
            return Err(AudioBufferError::invalid("float buffer size must be greater than 0"));
        }
        if size > source.len() {
            return Err(AudioBufferError::invalid(format!(
                "size ({size}) exceeds source length ({})",
                source.len()
            )));
        }
        Ok(Self {
            data: source[..size].to_vec(),
        })
    }

    /// Takes ownership of an already-built sample vector.
    pub(crate) fn from_vec(data: Vec<f32>) -> Self {
        debug_assert!(!data.is_empty());
        Self { data }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable access to the samples. The length stays fixed.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Zero every element in place.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

impl AsRef<[f32]> for FloatBuffer {
    fn as_ref(&self) -> &[f32] {
        &self.data
    }
}
