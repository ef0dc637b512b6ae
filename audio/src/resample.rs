//! Sample rate conversion with rubato.

use rubato::{FftFixedInOut, Resampler};

use crate::error::{AudioError, Result};
use crate::format::is_supported_rate;

/// Frames per processing block.
const CHUNK_SIZE: usize = 1024;

/// Resamples mono samples from `from` Hz to `to` Hz.
///
/// The output holds `len * to / from` samples (rounded), with the resampler
/// delay trimmed off the front. Equal rates return the input unchanged.
pub fn resample_mono(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if !is_supported_rate(from) || !is_supported_rate(to) {
        return Err(AudioError::Resample(format!(
            "unsupported conversion {} Hz -> {} Hz",
            from, to
        )));
    }

    let mut resampler = FftFixedInOut::<f32>::new(from as usize, to as usize, CHUNK_SIZE, 1)?;
    let expected = ((samples.len() as u64 * to as u64 + from as u64 / 2) / from as u64) as usize;
    let delay = resampler.output_delay();
    let mut out: Vec<f32> = Vec::with_capacity(expected + delay + resampler.output_frames_max());

    let mut pos = 0;
    while samples.len() - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let block = resampler.process(&[&samples[pos..pos + n]], None)?;
        out.extend_from_slice(&block[0]);
        pos += n;
    }
    if pos < samples.len() {
        let block = resampler.process_partial(Some(&[&samples[pos..]][..]), None)?;
        out.extend_from_slice(&block[0]);
    }

    // Flush what is still buffered inside the resampler.
    while out.len() < delay + expected {
        let block = resampler.process_partial(None::<&[&[f32]]>, None)?;
        if block[0].is_empty() {
            break;
        }
        out.extend_from_slice(&block[0]);
    }

    out.drain(..delay.min(out.len()));
    out.truncate(expected);
    Ok(out)
}
