//! Sample storage: owned float blocks, the overwriting ring buffer, and the
//! lock-free SPSC queue that hands captured samples to the pump thread.
//!
//! The capture queue uses `ringbuf::HeapRb<f32>`, whose `push_slice` is
//! wait-free and safe to call from the real-time audio callback.

pub mod float_buffer;
pub mod ring_buffer;

use ringbuf::{traits::Split, HeapRb};

pub use float_buffer::FloatBuffer;
pub use ring_buffer::RingBuffer;
pub use ringbuf::traits::{Consumer, Observer, Producer};

/// Producer half — held by the audio callback thread.
pub type CaptureProducer = ringbuf::HeapProd<f32>;

/// Consumer half — held by the pump thread.
pub type CaptureConsumer = ringbuf::HeapCons<f32>;

/// Default hand-off capacity: 2^18 = 262 144 f32 samples ≈ 5.4 s at 48 kHz.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1 << 18;

/// Create a matched producer/consumer pair holding `capacity` samples.
pub fn create_capture_queue(capacity: usize) -> (CaptureProducer, CaptureConsumer) {
    HeapRb::<f32>::new(capacity).split()
}
