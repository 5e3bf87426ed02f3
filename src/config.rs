//! Engine configuration, loadable from a board's TOML file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::device::{InputDesc, OutputDesc};

/// Which hardware backend the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Timing-accurate simulation; no audio hardware required.
    Sim,
    /// Real PCM devices through ALSA (needs the `alsa` feature).
    Alsa,
}

/// Boot-time configuration for [`AudioEngine`](crate::engine::AudioEngine).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Initial system volume, 0..100.
    pub volume: u8,
    pub backend: BackendKind,
    /// Rewrite the recorded WAV header with the true payload size after
    /// the session ends. Leave off where storage seeks are expensive.
    pub fixup_wav_header: bool,
    pub outputs: Vec<OutputDesc>,
    pub inputs: Vec<InputDesc>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volume: 70,
            backend: BackendKind::Sim,
            fixup_wav_header: false,
            outputs: Vec::new(),
            inputs: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse engine config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml_str(&text)
    }
}
