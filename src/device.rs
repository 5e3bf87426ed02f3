//! Hardware descriptors handed to the engine by board bring-up.
//!
//! A descriptor only names a device and its pin assignments; opening the
//! hardware is the backend's job and happens per stream.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Output device classes the engine can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Serial digital audio transmitter (speaker path, WAV playback).
    I2s,
    /// PWM tone generator (ringtone path).
    Buzzer,
}

/// Input device classes the engine can capture from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Serial digital audio receiver (microphone path).
    I2s,
}

/// Pin assignments for an I2S transmitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct I2sOutPins {
    pub sck: u32,
    pub ws: u32,
    pub sd: u32,
    #[serde(default)]
    pub mck: Option<u32>,
}

/// Pin assignments for an I2S receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct I2sInPins {
    pub sck: u32,
    pub ws: u32,
    pub sd_in: u32,
}

/// One registered audio output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDesc {
    pub name: String,
    pub kind: OutputKind,
    #[serde(default)]
    pub i2s_pins: Option<I2sOutPins>,
    #[serde(default)]
    pub buzzer_pin: Option<u32>,
    /// PCM device name consumed by the ALSA backend ("default" when unset).
    #[serde(default)]
    pub device: Option<String>,
}

impl OutputDesc {
    pub fn i2s(name: impl Into<String>, pins: I2sOutPins) -> Self {
        Self {
            name: name.into(),
            kind: OutputKind::I2s,
            i2s_pins: Some(pins),
            buzzer_pin: None,
            device: None,
        }
    }

    pub fn buzzer(name: impl Into<String>, pin: u32) -> Self {
        Self {
            name: name.into(),
            kind: OutputKind::Buzzer,
            i2s_pins: None,
            buzzer_pin: Some(pin),
            device: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.kind {
            OutputKind::I2s if self.i2s_pins.is_none() => {
                bail!("output '{}': i2s output requires i2s_pins", self.name)
            }
            OutputKind::Buzzer if self.buzzer_pin.is_none() => {
                bail!("output '{}': buzzer output requires buzzer_pin", self.name)
            }
            _ => Ok(()),
        }
    }
}

/// One registered audio input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDesc {
    pub name: String,
    pub kind: InputKind,
    pub i2s_pins: I2sInPins,
    /// PCM device name consumed by the ALSA backend ("default" when unset).
    #[serde(default)]
    pub device: Option<String>,
}

impl InputDesc {
    pub fn i2s(name: impl Into<String>, pins: I2sInPins) -> Self {
        Self { name: name.into(), kind: InputKind::I2s, i2s_pins: pins, device: None }
    }
}
