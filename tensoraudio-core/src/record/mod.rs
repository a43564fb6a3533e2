//! `AudioRecord` — continuous microphone capture into a bounded ring buffer.
//!
//! ## Lifecycle
//!
//! ```text
//! AudioRecord::new(config)       → ring allocated, status = Idle
//!     └─► start_recording()      → ring zeroed, device open, pump spawned, status = Recording
//!         └─► stop()             → running=false, pump joined, ring zeroed, status = Stopped
//! ```
//!
//! ## Threading
//!
//! `cpal::Stream` is `!Send` on Windows/macOS, so `AudioCapture` is created
//! *inside* the pump thread and never crosses a thread boundary. A sync
//! oneshot channel carries the open-device result back to `start_recording()`.
//!
//! The ring buffer itself has no internal locking; `AudioRecord` serialises
//! every access through a `parking_lot::Mutex`, so `AudioRecord` is
//! `Send + Sync` and can be read from an inference thread while capturing.

pub mod pump;

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    audio::{capture::AudioCapture, format::AudioFormat},
    buffering::{
        create_capture_queue, CaptureProducer, FloatBuffer, RingBuffer, DEFAULT_QUEUE_CAPACITY,
    },
    error::{AudioBufferError, Result},
    tensor::AudioSource,
};

pub use pump::{DiagnosticsSnapshot, PumpDiagnostics};

/// Configuration for `AudioRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordConfig {
    /// Format samples are stored in. Device audio is adapted to its channel
    /// count and resampled to its rate. Default: mono 16 kHz.
    pub format: AudioFormat,
    /// Ring buffer capacity in interleaved samples. Must be a multiple of the
    /// channel count. Default: 16000 (1 s of mono 16 kHz).
    pub buffer_size: usize,
    /// Input device name to prefer. `None` uses the system default.
    pub preferred_input_device: Option<String>,
    /// Capacity of the callback → pump hand-off queue, in samples.
    pub queue_capacity: usize,
    /// Frames the pump drains per iteration. 20 ms at 48 kHz = 960.
    pub drain_chunk: usize,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            buffer_size: 16_000,
            preferred_input_device: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_chunk: 960,
        }
    }
}

impl RecordConfig {
    fn validate(&self) -> Result<()> {
        let channels = usize::from(self.format.channel_count());
        if self.buffer_size == 0 {
            return Err(AudioBufferError::invalid("buffer size must be greater than 0"));
        }
        if self.buffer_size % channels != 0 {
            return Err(AudioBufferError::invalid(format!(
                "buffer size ({}) must be a multiple of the channel count ({channels})",
                self.buffer_size
            )));
        }
        if self.queue_capacity < channels {
            return Err(AudioBufferError::invalid(
                "queue capacity must hold at least one frame",
            ));
        }
        if self.drain_chunk == 0 {
            return Err(AudioBufferError::invalid("drain chunk must be greater than 0"));
        }
        Ok(())
    }
}

/// An open input stream, owned by the pump thread for its lifetime.
trait CaptureSession {
    /// Rate samples arrive at on the capture queue.
    fn sample_rate(&self) -> u32;
    fn stop(&self);
}

impl CaptureSession for AudioCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn stop(&self) {
        AudioCapture::stop(self);
    }
}

/// Current state of an `AudioRecord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Created, `start_recording()` not yet called.
    Idle,
    /// Device open, pump running.
    Recording,
    /// Capture stopped; may be restarted.
    Stopped,
    /// Device open or pump failure.
    Error,
}

/// Streaming capture source keeping the most recent `buffer_size` samples.
pub struct AudioRecord {
    config: RecordConfig,
    ring: Arc<Mutex<RingBuffer>>,
    /// `true` while capture + pump are active.
    running: Arc<AtomicBool>,
    status: Arc<Mutex<RecordStatus>>,
    diagnostics: Arc<PumpDiagnostics>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl AudioRecord {
    /// Create a record. Does not touch the audio device until `start_recording()`.
    ///
    /// # Errors
    /// `InvalidArgument` for an unusable `config`.
    pub fn new(config: RecordConfig) -> Result<Self> {
        config.validate()?;
        let ring = RingBuffer::new(config.buffer_size)?;
        Ok(Self {
            config,
            ring: Arc::new(Mutex::new(ring)),
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(RecordStatus::Idle)),
            diagnostics: Arc::new(PumpDiagnostics::default()),
            pump: Mutex::new(None),
        })
    }

    /// Start tapping the microphone.
    ///
    /// Blocks until the device is confirmed open (or fails). The ring buffer
    /// is zeroed first, so it only ever holds samples from this session.
    ///
    /// # Errors
    /// - `AlreadyRecording` if already started.
    /// - `NoDefaultInputDevice` / `AudioDevice` / `AudioStream` on device error.
    pub fn start_recording(&self) -> Result<()> {
        let channels = self.config.format.channel_count();
        let preferred = self.config.preferred_input_device.clone();
        self.start_with(move |producer, running, dropped| {
            AudioCapture::open_with_preference(
                producer,
                running,
                dropped,
                channels,
                preferred.as_deref(),
            )
        })
    }

    /// Spawn the pump thread, open the capture with `open` on it and wait for
    /// the result. After a successful open only the pump thread writes the
    /// status, so a pump failure is never masked by `Recording`.
    fn start_with<C, F>(&self, open: F) -> Result<()>
    where
        C: CaptureSession + 'static,
        F: FnOnce(CaptureProducer, Arc<AtomicBool>, Arc<AtomicUsize>) -> Result<C>
            + Send
            + 'static,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AudioBufferError::AlreadyRecording);
        }

        self.ring.lock().clear();
        self.diagnostics.reset();

        let (producer, consumer) = create_capture_queue(self.config.queue_capacity);

        let ring = Arc::clone(&self.ring);
        let running = Arc::clone(&self.running);
        let status = Arc::clone(&self.status);
        let diagnostics = Arc::clone(&self.diagnostics);
        let format = self.config.format;
        let drain_chunk = self.config.drain_chunk;

        // Sync oneshot: the pump thread reports the device open result.
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<u32>>();

        let handle = std::thread::Builder::new()
            .name("tensoraudio-pump".into())
            .spawn(move || {
                // ── Open the device on THIS thread (cpal::Stream is !Send) ──
                let capture = match open(
                    producer,
                    Arc::clone(&running),
                    Arc::clone(&diagnostics.samples_dropped),
                ) {
                    Ok(c) => {
                        *status.lock() = RecordStatus::Recording;
                        let _ = open_tx.send(Ok(c.sample_rate()));
                        c
                    }
                    Err(e) => {
                        *status.lock() = RecordStatus::Error;
                        running.store(false, Ordering::SeqCst);
                        let _ = open_tx.send(Err(e));
                        return;
                    }
                };

                let outcome = pump::run(pump::PumpContext {
                    consumer,
                    ring,
                    running: Arc::clone(&running),
                    diagnostics,
                    capture_sample_rate: capture.sample_rate(),
                    format,
                    drain_chunk,
                });

                if let Err(e) = outcome {
                    warn!("audio pump exited with error: {e}");
                    *status.lock() = RecordStatus::Error;
                    running.store(false, Ordering::SeqCst);
                }

                capture.stop();
                // Stream drops here, releasing the device on this thread.
                drop(capture);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                AudioBufferError::Io(e)
            })?;

        match open_rx.recv() {
            Ok(Ok(rate)) => {
                *self.pump.lock() = Some(handle);
                info!(device_rate = rate, "audio record started");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                self.running.store(false, Ordering::SeqCst);
                self.set_status(RecordStatus::Error);
                Err(AudioBufferError::Other(anyhow::anyhow!(
                    "audio pump died before opening the device"
                )))
            }
        }
    }

    /// Stop tapping the microphone and zero the ring buffer.
    ///
    /// # Errors
    /// `NotRecording` if not currently recording.
    pub fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) && self.pump.lock().is_none() {
            return Err(AudioBufferError::NotRecording);
        }

        if let Some(handle) = self.pump.lock().take() {
            if handle.join().is_err() {
                warn!("audio pump thread panicked");
            }
        }
        self.ring.lock().clear();
        self.set_status(RecordStatus::Stopped);
        info!("audio record stopped");
        Ok(())
    }

    /// Copy `size` samples starting `offset` samples into the ring (oldest-first).
    ///
    /// # Errors
    /// `InvalidArgument` if `size == 0` or `offset + size > buffer_size`.
    pub fn read(&self, offset: usize, size: usize) -> Result<FloatBuffer> {
        self.ring.lock().get_buffer(offset, size)
    }

    /// Append `source[offset..offset + size]` to the ring buffer directly.
    ///
    /// This is the path for callers that run their own capture loop.
    pub fn load(&self, source: &[f32], offset: usize, size: usize) -> Result<()> {
        self.ring.lock().load(source, offset, size)?;
        self.diagnostics.loads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn format(&self) -> AudioFormat {
        self.config.format
    }

    /// Ring buffer capacity in interleaved samples.
    pub fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    pub fn is_recording(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> RecordStatus {
        *self.status.lock()
    }

    /// Snapshot of pump counters for observability.
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    fn set_status(&self, new_status: RecordStatus) {
        *self.status.lock() = new_status;
    }
}

impl AudioSource for AudioRecord {
    fn format(&self) -> AudioFormat {
        self.config.format
    }

    fn available_samples(&self) -> Vec<f32> {
        self.ring
            .lock()
            .filled_buffer()
            .map(FloatBuffer::into_vec)
            .unwrap_or_default()
    }
}

impl Drop for AudioRecord {
    fn drop(&mut self) {
        if self.is_recording() {
            let _ = self.stop();
        }
    }
}

impl std::fmt::Debug for AudioRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioRecord")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(buffer_size: usize, channels: u16) -> AudioRecord {
        AudioRecord::new(RecordConfig {
            format: AudioFormat::new(channels, 16_000).unwrap(),
            buffer_size,
            ..RecordConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn rejects_invalid_config() {
        let zero = RecordConfig {
            buffer_size: 0,
            ..RecordConfig::default()
        };
        assert!(matches!(
            AudioRecord::new(zero),
            Err(AudioBufferError::InvalidArgument(_))
        ));

        let misaligned = RecordConfig {
            format: AudioFormat::new(2, 16_000).unwrap(),
            buffer_size: 5,
            ..RecordConfig::default()
        };
        assert!(AudioRecord::new(misaligned).is_err());
    }

    #[test]
    fn new_record_is_idle_and_zeroed() {
        let rec = record(4, 1);
        assert_eq!(rec.status(), RecordStatus::Idle);
        assert!(!rec.is_recording());
        assert_eq!(rec.read(0, 4).unwrap().data(), &[0.0; 4]);
        assert!(rec.available_samples().is_empty());
    }

    #[test]
    fn direct_loads_are_readable() {
        let rec = record(5, 1);
        rec.load(&[1.0, 2.0, 3.0], 0, 3).unwrap();
        assert_eq!(rec.read(0, 3).unwrap().data(), &[1.0, 2.0, 3.0]);
        rec.load(&[4.0, 5.0, 6.0, 7.0], 0, 4).unwrap();
        assert_eq!(rec.read(0, 5).unwrap().data(), &[3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(rec.diagnostics().loads, 2);
    }

    #[test]
    fn read_out_of_range_fails() {
        let rec = record(4, 1);
        assert!(rec.read(3, 2).is_err());
    }

    #[test]
    fn available_samples_are_oldest_first() {
        let rec = record(4, 2);
        rec.load(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 0, 6).unwrap();
        assert_eq!(rec.available_samples(), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn stop_without_start_is_rejected() {
        let rec = record(4, 1);
        assert!(matches!(rec.stop(), Err(AudioBufferError::NotRecording)));
    }

    struct FakeCapture {
        sample_rate: u32,
    }

    impl CaptureSession for FakeCapture {
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn stop(&self) {}
    }

    fn wait_until(mut done: impl FnMut() -> bool) {
        let start = std::time::Instant::now();
        while !done() {
            assert!(
                start.elapsed() < std::time::Duration::from_secs(2),
                "timed out waiting for pump"
            );
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
    }

    #[test]
    fn start_and_stop_with_fake_capture() {
        let rec = record(4, 1);
        rec.load(&[1.0, 2.0], 0, 2).unwrap();
        rec.start_with(|_, _, _| Ok(FakeCapture { sample_rate: 16_000 }))
            .unwrap();
        assert_eq!(rec.status(), RecordStatus::Recording);
        assert!(rec.is_recording());
        assert!(rec.available_samples().is_empty());
        assert!(matches!(
            rec.start_with(|_, _, _| Ok(FakeCapture { sample_rate: 16_000 })),
            Err(AudioBufferError::AlreadyRecording)
        ));

        rec.stop().unwrap();
        assert_eq!(rec.status(), RecordStatus::Stopped);
        assert!(!rec.is_recording());
    }

    #[test]
    fn open_failure_leaves_record_errored() {
        let rec = record(4, 1);
        let err = rec.start_with(|_, _, _| -> Result<FakeCapture> {
            Err(AudioBufferError::NoDefaultInputDevice)
        });
        assert!(matches!(err, Err(AudioBufferError::NoDefaultInputDevice)));
        assert_eq!(rec.status(), RecordStatus::Error);
        assert!(!rec.is_recording());
    }

    #[test]
    fn pump_failure_after_open_is_not_masked() {
        let rec = record(4, 1);
        // A zero capture rate makes the pump's resampler setup fail.
        rec.start_with(|_, _, _| Ok(FakeCapture { sample_rate: 0 }))
            .unwrap();
        wait_until(|| !rec.is_recording());
        assert_eq!(rec.status(), RecordStatus::Error);
    }

    #[cfg(not(feature = "audio-cpal"))]
    #[test]
    fn start_recording_without_backend_fails() {
        let rec = record(4, 1);
        assert!(matches!(
            rec.start_recording(),
            Err(AudioBufferError::AudioStream(_))
        ));
        assert_eq!(rec.status(), RecordStatus::Error);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: RecordConfig =
            serde_json::from_str(r#"{"bufferSize":32000}"#).expect("deserialize config");
        assert_eq!(config.buffer_size, 32_000);
        assert_eq!(config.format, AudioFormat::default());
        assert_eq!(config.drain_chunk, 960);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_value(RecordStatus::Recording).expect("serialize status");
        assert_eq!(json, "recording");
    }
}
