//! Building an `AudioTensor` from a WAV file.

use std::path::Path;

use tracing::debug;

use super::AudioTensor;
use crate::{
    audio::format::AudioFormat,
    error::{AudioBufferError, Result},
};

/// Decode every sample of `reader` to interleaved f32 in [-1, 1).
///
/// Integer samples of every bit depth are divided by full scale,
/// `2^(bits - 1)`, so 16-bit PCM is scaled by 1/32768.
fn decode_samples<R: std::io::Read>(reader: &mut hound::WavReader<R>) -> Result<Vec<f32>> {
    let spec = reader.spec();
    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<hound::Result<Vec<_>>>()?,
        hound::SampleFormat::Int => {
            let full_scale = int_full_scale(spec.bits_per_sample)?;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<hound::Result<Vec<_>>>()?
        }
    };
    Ok(samples)
}

fn int_full_scale(bits_per_sample: u16) -> Result<f32> {
    match bits_per_sample {
        1..=32 => Ok((1_u64 << (bits_per_sample - 1)) as f32),
        other => Err(AudioBufferError::invalid(format!(
            "unsupported integer WAV bit depth: {other}"
        ))),
    }
}

impl AudioTensor {
    /// Load up to `sample_count` frames of a WAV file, skipping the first
    /// `offset` frames.
    ///
    /// The tensor takes its format from the WAV header and holds
    /// `min(sample_count, frames after offset)` frames. When the file is
    /// longer, only the frames at its beginning are loaded.
    ///
    /// # Errors
    /// `InvalidArgument` if `sample_count == 0` or nothing remains after
    /// `offset`; `Wav` if the file cannot be decoded.
    pub fn from_wav_file(
        path: impl AsRef<Path>,
        sample_count: usize,
        offset: usize,
    ) -> Result<Self> {
        if sample_count == 0 {
            return Err(AudioBufferError::invalid("sample count must be greater than 0"));
        }

        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let format = AudioFormat::new(spec.channels, spec.sample_rate)?;
        let channels = usize::from(spec.channels);

        let samples = decode_samples(&mut reader)?;
        let total_frames = samples.len() / channels;
        if offset >= total_frames {
            return Err(AudioBufferError::invalid(format!(
                "offset ({offset}) leaves no frames in a {total_frames}-frame file"
            )));
        }

        let frames = sample_count.min(total_frames - offset);
        debug!(
            path = %path.display(),
            channels,
            sample_rate = spec.sample_rate,
            total_frames,
            frames,
            "loaded WAV into audio tensor"
        );

        let mut tensor = AudioTensor::new(format, frames)?;
        tensor.load(
            &samples,
            format.samples_for_frames(offset)?,
            format.samples_for_frames(frames)?,
        )?;
        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn write_int(path: &Path, channels: u16, bits_per_sample: u16, samples: &[i32]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 8_000,
            bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for s in samples {
            if bits_per_sample == 8 {
                writer.write_sample(*s as i8).unwrap();
            } else if bits_per_sample == 16 {
                writer.write_sample(*s as i16).unwrap();
            } else {
                writer.write_sample(*s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    fn write_pcm16(path: &Path, channels: u16, samples: &[i16]) {
        let widened: Vec<i32> = samples.iter().map(|s| i32::from(*s)).collect();
        write_int(path, channels, 16, &widened);
    }

    #[test]
    fn loads_beginning_of_longer_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.wav");
        write_pcm16(&path, 1, &[0, 8_192, 16_384, 24_576, i16::MAX]);

        let tensor = AudioTensor::from_wav_file(&path, 3, 1).unwrap();
        assert_eq!(tensor.format(), AudioFormat::mono(8_000).unwrap());
        assert_eq!(tensor.buffer_size(), 3);
        assert_eq!(tensor.to_vec(), vec![0.25, 0.5, 0.75]);
    }

    #[test]
    fn pcm16_uses_full_scale_divisor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extremes.wav");
        write_pcm16(&path, 1, &[i16::MIN, i16::MAX, 0]);

        let window = AudioTensor::from_wav_file(&path, 3, 0).unwrap().to_vec();
        assert_eq!(window[0], -1.0);
        assert_relative_eq!(window[1], 32_767.0 / 32_768.0);
        assert_eq!(window[2], 0.0);
    }

    #[test]
    fn eight_bit_file_reaches_full_scale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcm8.wav");
        write_int(&path, 1, 8, &[127, -128, 64]);

        let window = AudioTensor::from_wav_file(&path, 3, 0).unwrap().to_vec();
        assert_relative_eq!(window[0], 127.0 / 128.0);
        assert_eq!(window[1], -1.0);
        assert_eq!(window[2], 0.5);
    }

    #[test]
    fn twenty_four_bit_file_reaches_full_scale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcm24.wav");
        write_int(&path, 1, 24, &[-(1 << 23), 1 << 22]);

        let window = AudioTensor::from_wav_file(&path, 2, 0).unwrap().to_vec();
        assert_eq!(window, vec![-1.0, 0.5]);
    }

    #[test]
    fn short_file_shrinks_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_pcm16(&path, 2, &[100, -100, 200, -200]);

        let tensor = AudioTensor::from_wav_file(&path, 16, 0).unwrap();
        assert_eq!(tensor.format().channel_count(), 2);
        assert_eq!(tensor.sample_count(), 2);
        assert_eq!(tensor.buffer_size(), 4);
    }

    #[test]
    fn offset_past_end_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.wav");
        write_pcm16(&path, 1, &[1, 2]);

        assert!(matches!(
            AudioTensor::from_wav_file(&path, 4, 2),
            Err(AudioBufferError::InvalidArgument(_))
        ));
        assert!(AudioTensor::from_wav_file(&path, 0, 0).is_err());
    }

    #[test]
    fn missing_file_reports_wav_error() {
        let err = AudioTensor::from_wav_file("/nonexistent/never.wav", 4, 0);
        assert!(matches!(err, Err(AudioBufferError::Wav(_))));
    }
}
