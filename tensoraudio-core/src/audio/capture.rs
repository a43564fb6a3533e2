//! Microphone capture via the cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It **must not** block on a mutex, perform I/O, or allocate once warmed up.
//! Samples are converted to f32, adapted to the requested channel count and
//! pushed into the SPSC capture queue, whose `push_slice` is lock-free.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). `AudioCapture` must be created and dropped on the same thread;
//! [`crate::record::AudioRecord`] opens it on its pump thread.

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};

use crate::{
    buffering::{CaptureProducer, Observer, Producer},
    error::{AudioBufferError, Result},
};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

/// Handle to an active capture stream.
///
/// **Not `Send`** — `cpal::Stream` is bound to its creation thread on Windows/macOS.
pub struct AudioCapture {
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Set to `false` to make the callback no-op.
    running: Arc<AtomicBool>,
    /// Capture sample rate reported by the device (Hz).
    pub sample_rate: u32,
    /// Channel count the device delivers before adaptation.
    pub device_channels: u16,
}

/// Re-lay `data` (interleaved, `device_channels` wide) as `target_channels`
/// interleaved f32 frames in `out`.
///
/// - same width: converted as is
/// - to mono: average of all device channels
/// - from mono: the single channel duplicated to every output channel
/// - otherwise: the first `target_channels` device channels, missing ones zero
pub fn adapt_channels<T: Copy>(
    data: &[T],
    device_channels: usize,
    target_channels: usize,
    to_f32: impl Fn(T) -> f32,
    out: &mut Vec<f32>,
) {
    out.clear();
    if device_channels == 0 || target_channels == 0 {
        return;
    }
    let frames = data.len() / device_channels;
    out.reserve(frames * target_channels);

    for frame in data.chunks_exact(device_channels) {
        if device_channels == target_channels {
            out.extend(frame.iter().map(|s| to_f32(*s)));
        } else if target_channels == 1 {
            let sum: f32 = frame.iter().map(|s| to_f32(*s)).sum();
            out.push(sum / device_channels as f32);
        } else if device_channels == 1 {
            let sample = to_f32(frame[0]);
            out.extend(std::iter::repeat(sample).take(target_channels));
        } else {
            for ch in 0..target_channels {
                out.push(frame.get(ch).map_or(0.0, |s| to_f32(*s)));
            }
        }
    }
}

/// PCM16 → f32 in [-1, 1].
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / i16::MAX as f32
}

/// Unsigned 8-bit PCM → f32 in [-1, 1].
pub fn u8_to_f32(sample: u8) -> f32 {
    (sample as f32 - 128.0) / 128.0
}

/// Push whole frames of `samples` into the capture queue, counting what did
/// not fit. Frames are never split so the consumer stays channel-aligned.
#[cfg_attr(not(feature = "audio-cpal"), allow(dead_code))]
fn push_or_count(
    producer: &mut CaptureProducer,
    samples: &[f32],
    channels: usize,
    dropped: &AtomicUsize,
    label: &str,
) {
    let fit = producer.vacant_len().min(samples.len());
    let fit = fit - fit % channels.max(1);
    let written = producer.push_slice(&samples[..fit]);
    if written < samples.len() {
        let lost = samples.len() - written;
        dropped.fetch_add(lost, Ordering::Relaxed);
        tracing::warn!("capture queue full: dropped {} {} samples", lost, label);
    }
}

impl AudioCapture {
    /// Open an input device by preferred name, otherwise fall back to the
    /// default input device and then the first available device.
    ///
    /// Samples are delivered to `producer` with `target_channels` channels.
    #[cfg(feature = "audio-cpal")]
    pub fn open_with_preference(
        mut producer: CaptureProducer,
        running: Arc<AtomicBool>,
        dropped: Arc<AtomicUsize>,
        target_channels: u16,
        preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();
        let mut selected_device = None;

        if let Some(preferred_name) = preferred_device_name {
            match host.input_devices() {
                Ok(mut devices) => {
                    selected_device = devices.find(|device| {
                        device
                            .name()
                            .map(|name| name == preferred_name)
                            .unwrap_or(false)
                    });

                    if selected_device.is_none() {
                        warn!(
                            "preferred input device '{}' not found, falling back",
                            preferred_name
                        );
                    }
                }
                Err(e) => {
                    warn!("failed to list input devices while resolving preference: {e}");
                }
            }
        }

        let device = if let Some(device) = selected_device {
            device
        } else if let Some(default) = host.default_input_device() {
            default
        } else {
            let mut devices = host
                .input_devices()
                .map_err(|e| AudioBufferError::AudioDevice(e.to_string()))?;
            let fallback = devices
                .next()
                .ok_or(AudioBufferError::NoDefaultInputDevice)?;
            warn!("no default input device, falling back to first available input");
            fallback
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| AudioBufferError::AudioDevice(e.to_string()))?;

        let sample_rate = supported.sample_rate().0;
        let device_channels = supported.channels();

        info!(sample_rate, device_channels, target_channels, "capture config selected");

        let config = StreamConfig {
            channels: device_channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let dev_ch = usize::from(device_channels);
        let tgt_ch = usize::from(target_channels);
        let flag = Arc::clone(&running);
        let mut scratch: Vec<f32> = Vec::new();

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _info| {
                    if !flag.load(Ordering::Relaxed) {
                        return;
                    }
                    if dev_ch == tgt_ch {
                        push_or_count(&mut producer, data, tgt_ch, &dropped, "f32");
                        return;
                    }
                    adapt_channels(data, dev_ch, tgt_ch, |s| s, &mut scratch);
                    push_or_count(&mut producer, &scratch, tgt_ch, &dropped, "f32");
                },
                |err| error!("audio stream error: {err}"),
                None,
            ),

            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _info| {
                    if !flag.load(Ordering::Relaxed) {
                        return;
                    }
                    adapt_channels(data, dev_ch, tgt_ch, i16_to_f32, &mut scratch);
                    push_or_count(&mut producer, &scratch, tgt_ch, &dropped, "i16");
                },
                |err| error!("audio stream error: {err}"),
                None,
            ),

            SampleFormat::U8 => device.build_input_stream(
                &config,
                move |data: &[u8], _info| {
                    if !flag.load(Ordering::Relaxed) {
                        return;
                    }
                    adapt_channels(data, dev_ch, tgt_ch, u8_to_f32, &mut scratch);
                    push_or_count(&mut producer, &scratch, tgt_ch, &dropped, "u8");
                },
                |err| error!("audio stream error: {err}"),
                None,
            ),

            fmt => {
                return Err(AudioBufferError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| AudioBufferError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioBufferError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            running,
            sample_rate,
            device_channels,
        })
    }

    /// Stop: signal the callback to no-op on its next invocation.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl AudioCapture {
    pub fn open_with_preference(
        _producer: CaptureProducer,
        _running: Arc<AtomicBool>,
        _dropped: Arc<AtomicUsize>,
        _target_channels: u16,
        _preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        Err(AudioBufferError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }
}
