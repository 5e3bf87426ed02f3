//! audiocore - priority-arbitrated audio engine for embedded devices
//!
//! The device exposes one shared digital serial audio bus (speaker
//! output or microphone input, never both at once) plus an independent
//! tone generator. This crate arbitrates those scarce resources between
//! logical sound sources (music, notifications, alarms) by priority,
//! runs each accepted stream on a dedicated worker thread, and speaks
//! two formats: PCM WAV containers and RTTTL ringtones.

pub mod config;
pub mod device;
pub mod engine;
pub mod hal;
pub mod rtttl;
pub mod stream;
pub mod wav;

pub use config::{BackendKind, EngineConfig};
pub use device::{I2sInPins, I2sOutPins, InputDesc, InputKind, OutputDesc, OutputKind};
pub use engine::AudioEngine;
#[cfg(feature = "alsa")]
pub use hal::AlsaBackend;
pub use hal::{HardwareBackend, SimBackend};
pub use stream::{OnComplete, StreamError, StreamResult, StreamType};
