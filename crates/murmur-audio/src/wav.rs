//! WAV materialization for recognizers that require file input.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::NamedTempFile;

use crate::pcm::{AudioError, SAMPLE_RATE};

/// Write canonical PCM into a temp WAV file.
///
/// The file lives until the returned [`NamedTempFile`] drops, which is how
/// the adapter bounds the lifetime of `runtime/tmp` artifacts.
pub fn write_temp_wav(samples: &[i16], dir: &Path) -> Result<NamedTempFile, AudioError> {
    std::fs::create_dir_all(dir)?;
    let file = tempfile::Builder::new()
        .prefix("murmur-")
        .suffix(".wav")
        .tempfile_in(dir)?;
    write_wav(samples, file.path())?;
    Ok(file)
}

/// Write canonical PCM to the given path as 16 kHz mono 16-bit WAV.
pub fn write_wav(samples: &[i16], path: &Path) -> Result<(), AudioError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer =
        WavWriter::create(path, spec).map_err(|e| AudioError::Wav(format!("create: {e}")))?;
    for &s in samples {
        writer
            .write_sample(s)
            .map_err(|e| AudioError::Wav(format!("write: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| AudioError::Wav(format!("finalize: {e}")))?;
    Ok(())
}

/// Test helpers for synthesizing WAV containers in memory.
pub mod test_support {
    /// Generate a complete WAV file for the given interleaved samples.
    #[must_use]
    pub fn generate_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let bits_per_sample: u16 = 16;
        let byte_rate = sample_rate * u32::from(channels) * u32::from(bits_per_sample) / 8;
        let block_align = channels * bits_per_sample / 8;
        let data_size = (samples.len() * 2) as u32;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(file_size as usize + 8);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            buf.extend_from_slice(&s.to_le_bytes());
        }
        buf
    }
}
