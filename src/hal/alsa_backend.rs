//! ALSA-backed hardware leases for boards with a real PCM path.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result, bail};

use crate::device::{InputDesc, OutputDesc};

use super::{HardwareBackend, PcmInput, PcmOutput, ToneOutput};

/// Backend driving real hardware through ALSA.
pub struct AlsaBackend;

impl HardwareBackend for AlsaBackend {
    fn open_output(&self, desc: &OutputDesc, sample_rate: u32) -> Result<Box<dyn PcmOutput>> {
        let device = desc.device.as_deref().unwrap_or("default");
        let pcm = open_pcm(device, Direction::Playback, sample_rate, "Playback")?;
        Ok(Box::new(AlsaOutput { pcm }))
    }

    fn open_input(&self, desc: &InputDesc, sample_rate: u32) -> Result<Box<dyn PcmInput>> {
        let device = desc.device.as_deref().unwrap_or("default");
        let pcm = open_pcm(device, Direction::Capture, sample_rate, "Capture")?;
        Ok(Box::new(AlsaInput { pcm }))
    }

    fn open_tone(&self, desc: &OutputDesc) -> Result<Box<dyn ToneOutput>> {
        bail!(
            "output '{}': tone generation needs a PWM peripheral, which the ALSA backend does not expose",
            desc.name
        )
    }
}

fn open_pcm(device: &str, direction: Direction, sample_rate: u32, dir_name: &str) -> Result<PCM> {
    let pcm = PCM::new(device, direction, false)
        .with_context(|| format!("Failed to open PCM device '{}' for {}", device, dir_name))?;

    {
        let hwp = HwParams::any(&pcm).with_context(|| "Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(Format::S16LE)?;
        hwp.set_channels(1)?;
        hwp.set_rate_near(sample_rate, ValueOr::Nearest)?;
        pcm.hw_params(&hwp)?;
    }

    let actual_rate = {
        let hwp = pcm.hw_params_current()?;
        hwp.get_rate()?
    };

    log::info!(
        "ALSA {}: device={}, requested={} Hz, negotiated={} Hz",
        dir_name,
        device,
        sample_rate,
        actual_rate,
    );

    Ok(pcm)
}

struct AlsaOutput {
    pcm: PCM,
}

impl PcmOutput for AlsaOutput {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let samples: Vec<i16> = buf
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        let io = self.pcm.io_i16()?;
        let mut written = 0;
        while written < samples.len() {
            match io.writei(&samples[written..]) {
                Ok(frames) => written += frames,
                Err(e) => {
                    log::warn!("ALSA playback error: {}, recovering...", e);
                    self.pcm
                        .prepare()
                        .with_context(|| "Failed to recover PCM playback")?;
                }
            }
        }
        Ok(())
    }
}

struct AlsaInput {
    pcm: PCM,
}

impl PcmInput for AlsaInput {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut samples = vec![0i16; buf.len() / 2];

        let frames = {
            let io = self.pcm.io_i16()?;
            match io.readi(&mut samples) {
                Ok(frames) => frames,
                Err(e) => {
                    log::warn!("ALSA capture error: {}, recovering...", e);
                    self.pcm
                        .prepare()
                        .with_context(|| "Failed to recover PCM capture")?;
                    0
                }
            }
        };

        for (i, sample) in samples[..frames].iter().enumerate() {
            buf[i * 2..i * 2 + 2].copy_from_slice(&sample.to_le_bytes());
        }
        Ok(frames * 2)
    }
}
