//! Overwriting circular buffer of f32 samples.
//!
//! ## Ordering
//!
//! Reads see the `capacity` storage slots in oldest-first order. Until the
//! buffer first fills, that is the written samples starting at slot 0
//! followed by slots that are still zero. Once full, the slots are rotated so
//! the logical sequence starts at the write cursor (the oldest retained
//! sample) and ends with the newest one.
//!
//! ## Threading
//!
//! No internal synchronisation. Mutation takes `&mut self`; callers that share
//! a `RingBuffer` between a capture thread and an inference thread wrap it in
//! a mutex (see [`crate::record::AudioRecord`]) so a reader never observes a
//! half-applied wrap-around.

use tracing::trace;

use super::float_buffer::FloatBuffer;
use crate::error::{check_slice_bounds, AudioBufferError, Result};

/// Fixed-capacity circular store retaining the most recent `capacity` samples.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    storage: Vec<f32>,
    /// Slot the next sample is written to.
    next_index: usize,
    /// Number of samples written since creation/clear, saturating at capacity.
    len: usize,
}

impl RingBuffer {
    /// Create a zero-filled ring buffer holding `capacity` samples.
    ///
    /// # Errors
    /// `InvalidArgument` if `capacity == 0`.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(AudioBufferError::invalid("ring buffer capacity must be greater than 0"));
        }
        Ok(Self {
            storage: vec![0.0; capacity],
            next_index: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Number of retained samples written since creation or the last `clear`.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Append `source[offset..offset + size]`, overwriting the oldest samples.
    ///
    /// When `size` exceeds the capacity only the last `capacity` samples of the
    /// slice are kept. A zero-length load is a no-op.
    ///
    /// # Errors
    /// `InvalidArgument` if the slice falls outside `source`. Nothing is
    /// written in that case.
    pub fn load(&mut self, source: &[f32], offset: usize, size: usize) -> Result<()> {
        check_slice_bounds(source.len(), offset, size)?;
        if size == 0 {
            return Ok(());
        }

        let capacity = self.capacity();
        let (offset, size) = if size > capacity {
            (offset + (size - capacity), capacity)
        } else {
            (offset, size)
        };
        let incoming = &source[offset..offset + size];

        let first = size.min(capacity - self.next_index);
        self.storage[self.next_index..self.next_index + first].copy_from_slice(&incoming[..first]);
        let rest = size - first;
        if rest > 0 {
            self.storage[..rest].copy_from_slice(&incoming[first..]);
        }

        self.next_index = (self.next_index + size) % capacity;
        self.len = (self.len + size).min(capacity);
        trace!(size, next_index = self.next_index, len = self.len, "ring buffer load");
        Ok(())
    }

    /// Convenience for loading a whole slice.
    pub fn load_all(&mut self, source: &[f32]) -> Result<()> {
        self.load(source, 0, source.len())
    }

    /// Copy `size` samples starting at logical position `offset` (oldest-first).
    ///
    /// # Errors
    /// `InvalidArgument` if `size == 0` or `offset + size > capacity`.
    pub fn get_buffer(&self, offset: usize, size: usize) -> Result<FloatBuffer> {
        let capacity = self.capacity();
        if size == 0 {
            return Err(AudioBufferError::invalid("requested size must be greater than 0"));
        }
        if offset.checked_add(size).map_or(true, |end| end > capacity) {
            return Err(AudioBufferError::invalid(format!(
                "offset ({offset}) + size ({size}) exceeds ring buffer capacity ({capacity})"
            )));
        }

        let start = (self.oldest_index() + offset) % capacity;
        let first = size.min(capacity - start);
        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(&self.storage[start..start + first]);
        out.extend_from_slice(&self.storage[..size - first]);
        Ok(FloatBuffer::from_vec(out))
    }

    /// All `capacity` slots, oldest-first.
    pub fn float_buffer(&self) -> FloatBuffer {
        let capacity = self.capacity();
        let start = self.oldest_index();
        let mut out = Vec::with_capacity(capacity);
        out.extend_from_slice(&self.storage[start..]);
        out.extend_from_slice(&self.storage[..start]);
        FloatBuffer::from_vec(out)
    }

    /// The retained samples only, oldest-first. `None` if nothing was written.
    pub fn filled_buffer(&self) -> Option<FloatBuffer> {
        if self.is_empty() {
            return None;
        }
        self.get_buffer(0, self.len).ok()
    }

    /// Zero the storage and forget every written sample.
    pub fn clear(&mut self) {
        self.storage.fill(0.0);
        self.next_index = 0;
        self.len = 0;
    }

    fn oldest_index(&self) -> usize {
        if self.is_full() {
            self.next_index
        } else {
            0
        }
    }
}
