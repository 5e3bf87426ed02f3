//! Hardware abstraction: the backend a stream leases its device from.
//!
//! Two implementations exist: a simulated backend that paces transfers in
//! wall-clock time (so development hosts behave timing-wise like the
//! device), and an ALSA backend behind the `alsa` feature for boards with
//! a real PCM path. The backend is chosen explicitly when the engine is
//! constructed, never by runtime probing.

use anyhow::Result;

use crate::device::{InputDesc, OutputDesc};

#[cfg(feature = "alsa")]
mod alsa_backend;
mod sim;

#[cfg(feature = "alsa")]
pub use alsa_backend::AlsaBackend;
pub use sim::SimBackend;

/// A leased PCM output. Dropping the handle releases the hardware.
pub trait PcmOutput: Send {
    /// Write one chunk of 16-bit little-endian PCM bytes.
    fn write(&mut self, buf: &[u8]) -> Result<()>;
}

/// A leased PCM input. Dropping the handle releases the hardware.
pub trait PcmInput: Send {
    /// Read up to `buf.len()` bytes of 16-bit little-endian PCM.
    /// Returns the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// A leased tone generator.
pub trait ToneOutput: Send {
    fn set_tone(&mut self, freq_hz: u32, duty: u16) -> Result<()>;
    fn silence(&mut self) -> Result<()>;
}

/// Factory for hardware leases. One backend instance serves the whole
/// engine; each stream opens and owns its handle for the session.
pub trait HardwareBackend: Send + Sync {
    fn open_output(&self, desc: &OutputDesc, sample_rate: u32) -> Result<Box<dyn PcmOutput>>;
    fn open_input(&self, desc: &InputDesc, sample_rate: u32) -> Result<Box<dyn PcmInput>>;
    fn open_tone(&self, desc: &OutputDesc) -> Result<Box<dyn ToneOutput>>;
}
