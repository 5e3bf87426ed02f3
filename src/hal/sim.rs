//! Simulated hardware for hosts without an audio path.
//!
//! Output writes sleep for the wall-clock duration the samples would
//! take on real hardware, so playback timing is comparable. Input reads
//! synthesize a phase-continuous 440 Hz sine wave.

use std::f64::consts::TAU;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::device::{InputDesc, OutputDesc};

use super::{HardwareBackend, PcmInput, PcmOutput, ToneOutput};

/// A4 reference tone generated by the simulated microphone.
const SIM_TONE_HZ: f64 = 440.0;
/// Roughly half of full-scale 16-bit amplitude.
const SIM_AMPLITUDE: f64 = 16000.0;

/// Backend used on development hosts and boards without audio hardware.
pub struct SimBackend;

impl HardwareBackend for SimBackend {
    fn open_output(&self, desc: &OutputDesc, sample_rate: u32) -> Result<Box<dyn PcmOutput>> {
        log::info!("sim output '{}' opened at {} Hz", desc.name, sample_rate);
        Ok(Box::new(SimOutput { sample_rate }))
    }

    fn open_input(&self, desc: &InputDesc, sample_rate: u32) -> Result<Box<dyn PcmInput>> {
        log::info!("sim input '{}' opened at {} Hz (440 Hz sine)", desc.name, sample_rate);
        Ok(Box::new(SimInput { sample_rate, sample_offset: 0 }))
    }

    fn open_tone(&self, desc: &OutputDesc) -> Result<Box<dyn ToneOutput>> {
        log::info!("sim tone generator '{}' opened", desc.name);
        Ok(Box::new(SimTone))
    }
}

struct SimOutput {
    sample_rate: u32,
}

impl PcmOutput for SimOutput {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        // One 16-bit mono sample per two bytes
        let secs = (buf.len() as f64 / 2.0) / self.sample_rate as f64;
        thread::sleep(Duration::from_secs_f64(secs));
        Ok(())
    }
}

struct SimInput {
    sample_rate: u32,
    /// Running sample index, kept across reads so the sine has no
    /// discontinuity at chunk boundaries.
    sample_offset: u64,
}

impl SimInput {
    fn fill(&mut self, buf: &mut [u8]) -> usize {
        let num_samples = buf.len() / 2;
        for i in 0..num_samples {
            let t = (self.sample_offset + i as u64) as f64 / self.sample_rate as f64;
            let sample = (SIM_AMPLITUDE * (TAU * SIM_TONE_HZ * t).sin()) as i64;
            let sample = sample.clamp(i16::MIN as i64, i16::MAX as i64) as i16;
            buf[i * 2..i * 2 + 2].copy_from_slice(&sample.to_le_bytes());
        }
        self.sample_offset += num_samples as u64;
        num_samples * 2
    }
}

impl PcmInput for SimInput {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.fill(buf);
        // Pace like a real capture device delivering samples in real time
        let secs = (n as f64 / 2.0) / self.sample_rate as f64;
        thread::sleep(Duration::from_secs_f64(secs));
        Ok(n)
    }
}

struct SimTone;

impl ToneOutput for SimTone {
    fn set_tone(&mut self, freq_hz: u32, duty: u16) -> Result<()> {
        log::debug!("sim tone: {} Hz, duty {}", freq_hz, duty);
        Ok(())
    }

    fn silence(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_samples(buf: &[u8]) -> Vec<i16> {
        buf.chunks_exact(2).map(|p| i16::from_le_bytes([p[0], p[1]])).collect()
    }

    #[test]
    fn sine_is_phase_continuous_across_chunks() {
        let rate = 16000u32;
        let mut input = SimInput { sample_rate: rate, sample_offset: 0 };
        let mut first = vec![0u8; 1024];
        let mut second = vec![0u8; 1024];
        input.fill(&mut first);
        input.fill(&mut second);

        let a = to_samples(&first);
        let b = to_samples(&second);

        // The first sample of the second chunk must continue the waveform,
        // not restart it: compare against the analytic value at its index.
        let n = a.len() as u64;
        let t = n as f64 / rate as f64;
        let expected = (SIM_AMPLITUDE * (TAU * SIM_TONE_HZ * t).sin()) as i16;
        assert_eq!(b[0], expected);

        // And the step across the boundary stays within the waveform's
        // maximum slope (2*pi*f*A/rate per sample, with rounding slack).
        let max_step = (TAU * SIM_TONE_HZ * SIM_AMPLITUDE / rate as f64) as i32 + 2;
        let step = (b[0] as i32 - a[a.len() - 1] as i32).abs();
        assert!(step <= max_step, "step {} exceeds max slope {}", step, max_step);
    }

    #[test]
    fn sine_chunks_are_not_identical() {
        // A phase reset per chunk would make consecutive chunks equal
        let mut input = SimInput { sample_rate: 16000, sample_offset: 0 };
        let mut first = vec![0u8; 512];
        let mut second = vec![0u8; 512];
        input.fill(&mut first);
        input.fill(&mut second);
        assert_ne!(first, second);
    }
}
