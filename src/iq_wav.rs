//! IQ recordings as two-channel WAV files, and phase output as mono WAV.
//!
//! Channel 0 carries the real (I) part and channel 1 the imaginary (Q) part.
//! Integer recordings are normalized to ±1.

use crate::error::{ArgError, ArgResult};
use crate::Sample;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Samples and sample rate of an IQ recording.
#[derive(Debug, Clone, PartialEq)]
pub struct IqRecording {
    pub sample_rate: u32,
    pub samples: Vec<Sample>,
}

/// Read a two-channel WAV file as IQ samples.
pub fn read_iq_wav<P: AsRef<Path>>(path: P) -> ArgResult<IqRecording> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.channels != 2 {
        return Err(ArgError::InvalidRecording(format!(
            "expected 2 channels (I/Q), found {}",
            spec.channels
        )));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = interleaved
        .chunks_exact(2)
        .map(|iq| Sample::new(iq[0], iq[1]))
        .collect();
    Ok(IqRecording {
        sample_rate: spec.sample_rate,
        samples,
    })
}

/// Write IQ samples as a two-channel 32-bit float WAV file.
pub fn write_iq_wav<P: AsRef<Path>>(path: P, samples: &[Sample], sample_rate: u32) -> ArgResult<()> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for s in samples {
        writer.write_sample(s.re)?;
        writer.write_sample(s.im)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write phase angles as a mono 32-bit float WAV file.
pub fn write_phase_wav<P: AsRef<Path>>(path: P, phases: &[f32], sample_rate: u32) -> ArgResult<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &phase in phases {
        writer.write_sample(phase)?;
    }
    writer.finalize()?;
    Ok(())
}
