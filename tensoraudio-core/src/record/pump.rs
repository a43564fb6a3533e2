//! Blocking pump loop moving captured samples into the record's ring buffer.
//!
//! ## Stages (per iteration)
//!
//! ```text
//! 1. Pop whole frames from the SPSC capture queue
//! 2. Resample to the record's format rate (passthrough when rates match)
//! 3. Lock the ring buffer and append the block, evicting the oldest samples
//! ```
//!
//! The ring lock is held only for the `load` call, so readers on the
//! inference thread see either the state before or after a whole block.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, OnceLock,
};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::{
    audio::{format::AudioFormat, resample::RateConverter},
    buffering::{CaptureConsumer, Consumer, Observer, RingBuffer},
    error::Result,
};

/// Minimum sleep when the queue is empty (avoids busy-wait burning a core).
const DEFAULT_IDLE_SLEEP_MS: u64 = 5;

#[derive(Default)]
pub struct PumpDiagnostics {
    pub samples_in: AtomicUsize,
    pub samples_resampled: AtomicUsize,
    /// Shared with the capture callback, which increments it on queue overflow.
    pub samples_dropped: Arc<AtomicUsize>,
    pub loads: AtomicUsize,
}

impl PumpDiagnostics {
    pub fn reset(&self) {
        self.samples_in.store(0, Ordering::Relaxed);
        self.samples_resampled.store(0, Ordering::Relaxed);
        self.samples_dropped.store(0, Ordering::Relaxed);
        self.loads.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            samples_in: self.samples_in.load(Ordering::Relaxed),
            samples_resampled: self.samples_resampled.load(Ordering::Relaxed),
            samples_dropped: self.samples_dropped.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub samples_in: usize,
    pub samples_resampled: usize,
    pub samples_dropped: usize,
    pub loads: usize,
}

/// Everything the pump needs, passed as one struct so the spawn closure stays tidy.
pub struct PumpContext {
    pub consumer: CaptureConsumer,
    pub ring: Arc<Mutex<RingBuffer>>,
    pub running: Arc<AtomicBool>,
    pub diagnostics: Arc<PumpDiagnostics>,
    /// Rate the capture queue is filled at.
    pub capture_sample_rate: u32,
    /// Format the ring buffer holds.
    pub format: AudioFormat,
    /// Frames popped per iteration.
    pub drain_chunk: usize,
}

/// Run the pump until `ctx.running` becomes false.
///
/// # Errors
/// Fails only if the resampler cannot be created; the caller marks the
/// record as errored.
pub fn run(mut ctx: PumpContext) -> Result<()> {
    info!("audio pump started");

    let channels = usize::from(ctx.format.channel_count());
    let mut resampler = RateConverter::new(
        ctx.capture_sample_rate,
        ctx.format.sample_rate(),
        channels,
        ctx.drain_chunk,
    )
    .map_err(|e| {
        error!("failed to create resampler: {e}");
        e
    })?;

    // Scratch block reused each iteration
    let mut raw = vec![0f32; ctx.format.samples_for_frames(ctx.drain_chunk)?];

    loop {
        if !ctx.running.load(Ordering::Relaxed) {
            break;
        }

        let available = ctx.consumer.occupied_len().min(raw.len());
        let aligned = available - available % channels;
        if aligned == 0 {
            std::thread::sleep(Duration::from_millis(idle_sleep_ms()));
            continue;
        }
        let n = ctx.consumer.pop_slice(&mut raw[..aligned]);
        ctx.diagnostics.samples_in.fetch_add(n, Ordering::Relaxed);

        let block = resampler.process(&raw[..n]);
        if block.is_empty() {
            // Waiting for rubato's input chunk to fill
            continue;
        }
        ctx.diagnostics
            .samples_resampled
            .fetch_add(block.len(), Ordering::Relaxed);

        ctx.ring.lock().load_all(&block)?;
        ctx.diagnostics.loads.fetch_add(1, Ordering::Relaxed);
        debug!(raw = n, loaded = block.len(), "pumped audio block");
    }

    let snap = ctx.diagnostics.snapshot();
    info!(
        samples_in = snap.samples_in,
        samples_resampled = snap.samples_resampled,
        samples_dropped = snap.samples_dropped,
        loads = snap.loads,
        "audio pump stopped — diagnostics"
    );
    Ok(())
}

fn idle_sleep_ms() -> u64 {
    static IDLE_SLEEP_MS: OnceLock<u64> = OnceLock::new();
    *IDLE_SLEEP_MS.get_or_init(|| {
        std::env::var("TENSORAUDIO_PUMP_IDLE_SLEEP_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(|v| v.clamp(1, 20))
            .unwrap_or(DEFAULT_IDLE_SLEEP_MS)
    })
}
