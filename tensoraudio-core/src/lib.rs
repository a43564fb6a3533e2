//! # tensoraudio-core
//!
//! Fixed-capacity audio buffers feeding on-device audio models.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → AudioCapture → SPSC queue → pump thread (resample)
//!                                               │
//!                                  Mutex<RingBuffer> inside AudioRecord
//!                                               │
//!                          AudioTensor::load_source (sliding window)
//!                                               │
//!                                   model input (oldest → newest)
//! ```
//!
//! `FloatBuffer`, `RingBuffer` and `AudioTensor` do no internal locking:
//! mutation takes `&mut self`, and callers sharing one across threads wrap it
//! in a mutex the way `AudioRecord` does. Every operation validates its
//! arguments before touching storage, so a failed call leaves the buffer as
//! it was.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod error;
pub mod record;
pub mod tensor;

// Convenience re-exports for downstream crates
pub use audio::AudioFormat;
pub use buffering::{FloatBuffer, RingBuffer};
pub use error::{AudioBufferError, Result};
pub use record::{AudioRecord, RecordConfig, RecordStatus};
pub use tensor::{AudioSource, AudioTensor};
