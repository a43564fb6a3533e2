//! Capture path without hardware: device-shaped blocks go through channel
//! adaptation and the SPSC queue, and the pump loads them into a ring buffer
//! that an `AudioTensor` reads from.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use parking_lot::Mutex;
use tensoraudio_core::{
    audio::capture::{adapt_channels, i16_to_f32},
    buffering::{create_capture_queue, Producer},
    record::pump::{self, PumpContext, PumpDiagnostics},
    AudioFormat, AudioTensor, RingBuffer,
};

fn wait_until(mut done: impl FnMut() -> bool) {
    let start = Instant::now();
    while !done() {
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "timed out waiting for pump"
        );
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn stereo_device_blocks_reach_mono_tensor() {
    let format = AudioFormat::mono(16_000).unwrap();
    let (mut producer, consumer) = create_capture_queue(1024);
    let ring = Arc::new(Mutex::new(RingBuffer::new(8).unwrap()));
    let running = Arc::new(AtomicBool::new(true));
    let diagnostics = Arc::new(PumpDiagnostics::default());

    let ctx = PumpContext {
        consumer,
        ring: Arc::clone(&ring),
        running: Arc::clone(&running),
        diagnostics: Arc::clone(&diagnostics),
        capture_sample_rate: 16_000,
        format,
        drain_chunk: 64,
    };
    let handle = thread::spawn(move || pump::run(ctx));

    // Stereo PCM16 frames whose channels average to 0, 0.25, 0.5 ... 2.75.
    let device: Vec<i16> = (0..12)
        .flat_map(|i| {
            let mid = i as f32 * 0.25 * 8_000.0;
            [(mid - 1_000.0) as i16, (mid + 1_000.0) as i16]
        })
        .collect();
    let mut adapted = Vec::new();
    adapt_channels(&device, 2, 1, i16_to_f32, &mut adapted);
    assert_eq!(adapted.len(), 12);
    assert_eq!(producer.push_slice(&adapted), 12);

    wait_until(|| diagnostics.samples_in.load(Ordering::Relaxed) >= 12);
    wait_until(|| ring.lock().is_full());
    running.store(false, Ordering::SeqCst);
    handle.join().expect("pump thread panicked").unwrap();

    let mut tensor = AudioTensor::new(format, 4).unwrap();
    let latest = ring.lock().get_buffer(4, 4).unwrap();
    tensor.load_all(latest.data()).unwrap();

    let window = tensor.to_vec();
    for (i, sample) in window.iter().enumerate() {
        let expected = (8 + i) as f32 * 0.25 * 8_000.0 / i16::MAX as f32;
        assert_relative_eq!(*sample, expected, epsilon = 1e-4);
    }
    assert_eq!(diagnostics.snapshot().samples_dropped, 0);
}

#[test]
fn wav_window_feeds_ring_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for i in 0..10 {
        writer.write_sample(i as f32 / 10.0).unwrap();
    }
    writer.finalize().unwrap();

    let tensor = AudioTensor::from_wav_file(&path, 6, 2).unwrap();
    assert_eq!(tensor.format(), AudioFormat::mono(16_000).unwrap());
    let expected: Vec<f32> = (2..8).map(|i| i as f32 / 10.0).collect();
    assert_eq!(tensor.to_vec(), expected);

    let mut ring = RingBuffer::new(4).unwrap();
    ring.load_all(tensor.buffer().data()).unwrap();
    assert_eq!(ring.float_buffer().data(), &expected[2..]);
}
