//! Sliding-window throughput benchmark.
//!
//! Streams synthetic capture blocks through a `RingBuffer` and refreshes an
//! `AudioTensor` from it after every block, the way an inference loop would.
//!
//! ```text
//! benchmark [--iterations N] [--block SAMPLES] [--window SAMPLES]
//!           [--ring SAMPLES] [--output report.json]
//! ```

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tensoraudio_core::{AudioFormat, AudioTensor, RingBuffer};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = run() {
        eprintln!("benchmark failed: {e}");
        std::process::exit(1);
    }
}

#[derive(Debug)]
struct Args {
    iterations: usize,
    block: usize,
    window: usize,
    ring: usize,
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    iterations: usize,
    block_samples: usize,
    window_samples: usize,
    ring_samples: usize,
    p50_iteration_us: f64,
    p95_iteration_us: f64,
    avg_iteration_us: f64,
    samples_per_sec: f64,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        iterations: 10_000,
        block: 960,
        window: 15_600,
        ring: 32_000,
        output: None,
    };

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |name: &str| {
            it.next()
                .ok_or_else(|| format!("missing value for {name}"))
        };
        match arg.as_str() {
            "--iterations" => args.iterations = parse_count(&value("--iterations")?)?,
            "--block" => args.block = parse_count(&value("--block")?)?,
            "--window" => args.window = parse_count(&value("--window")?)?,
            "--ring" => args.ring = parse_count(&value("--ring")?)?,
            "--output" => args.output = Some(PathBuf::from(value("--output")?)),
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(args)
}

fn parse_count(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) | Err(_) => Err(format!("expected a positive integer, got '{raw}'")),
        Ok(v) => Ok(v),
    }
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn run() -> Result<(), String> {
    let args = parse_args()?;
    info!(?args, "starting sliding-window benchmark");

    let format = AudioFormat::mono(16_000).map_err(|e| e.to_string())?;
    let mut ring = RingBuffer::new(args.ring).map_err(|e| e.to_string())?;
    let mut tensor = AudioTensor::new(format, args.window).map_err(|e| e.to_string())?;

    let block: Vec<f32> = (0..args.block)
        .map(|i| ((i as f32) * 0.01).sin() * 0.5)
        .collect();
    let read_size = args.block.min(args.ring);

    let mut timings = Vec::with_capacity(args.iterations);
    let total_start = Instant::now();
    for _ in 0..args.iterations {
        let start = Instant::now();
        ring.load_all(&block).map_err(|e| e.to_string())?;
        let latest = ring
            .get_buffer(ring.len() - read_size, read_size)
            .map_err(|e| e.to_string())?;
        tensor.load_all(latest.data()).map_err(|e| e.to_string())?;
        timings.push(start.elapsed().as_secs_f64() * 1e6);
    }
    let total_secs = total_start.elapsed().as_secs_f64();

    let avg = timings.iter().sum::<f64>() / timings.len() as f64;
    timings.sort_by(|a, b| a.total_cmp(b));

    let summary = Summary {
        iterations: args.iterations,
        block_samples: args.block,
        window_samples: args.window,
        ring_samples: args.ring,
        p50_iteration_us: percentile(&timings, 0.50),
        p95_iteration_us: percentile(&timings, 0.95),
        avg_iteration_us: avg,
        samples_per_sec: if total_secs > 0.0 {
            (args.iterations * args.block) as f64 / total_secs
        } else {
            0.0
        },
    };

    println!(
        "Done. iterations={} p50={:.2}us p95={:.2}us throughput={:.0} samples/s",
        summary.iterations,
        summary.p50_iteration_us,
        summary.p95_iteration_us,
        summary.samples_per_sec
    );

    let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
    if let Some(out) = args.output {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        std::fs::write(&out, json).map_err(|e| e.to_string())?;
        println!("Wrote benchmark report: {}", out.display());
    } else {
        println!("{json}");
    }

    Ok(())
}
