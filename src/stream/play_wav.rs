//! WAV playback session: parse the container, then pump the PCM payload
//! to the output in bounded chunks.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use crate::device::OutputDesc;
use crate::hal::HardwareBackend;
use crate::wav;

use super::{OnComplete, StreamError, StreamHandle, StreamResult};

/// Transfer unit for the payload pump.
const PLAY_CHUNK: usize = 4096;

pub struct WavPlayback {
    path: PathBuf,
    volume: u8,
    handle: Arc<StreamHandle>,
    output: OutputDesc,
    backend: Arc<dyn HardwareBackend>,
    on_complete: Option<OnComplete>,
}

impl WavPlayback {
    pub fn new(
        path: PathBuf,
        volume: u8,
        handle: Arc<StreamHandle>,
        output: OutputDesc,
        backend: Arc<dyn HardwareBackend>,
        on_complete: Option<OnComplete>,
    ) -> Self {
        Self { path, volume, handle, output, backend, on_complete }
    }

    /// Blocking run loop; the worker thread's entry point. The hardware
    /// lease is released before the completion callback fires.
    pub fn run(mut self) {
        let result = self.stream();
        self.handle.deactivate();
        match &result {
            Ok(msg) => log::info!("WAV playback: {}", msg),
            Err(e) => log::error!("WAV playback error: {}", e),
        }
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(result);
        }
    }

    fn stream(&mut self) -> StreamResult {
        let mut file = File::open(&self.path)?;
        let info = wav::read_info(&mut file)?;

        if info.channels != 1 {
            return Err(StreamError::Format("only mono supported"));
        }
        if info.bits_per_sample != 16 {
            return Err(StreamError::Format("only 16-bit PCM supported"));
        }

        log::info!(
            "WAV playback: {} ({} Hz, {} bytes, volume {}%)",
            self.path.display(),
            info.sample_rate,
            info.data_size,
            self.volume,
        );

        let mut out = self
            .backend
            .open_output(&self.output, info.sample_rate)
            .map_err(|e| StreamError::Hardware(e.to_string()))?;

        file.seek(SeekFrom::Start(info.data_offset))?;
        self.handle.set_total_bytes(info.data_size as u64);

        let scale = self.volume.min(100) as f32 / 100.0;
        let data_size = info.data_size as u64;
        let mut buf = vec![0u8; PLAY_CHUNK];
        let mut total: u64 = 0;

        while total < data_size {
            if !self.handle.should_run() {
                log::info!("WAV playback stopped by request");
                break;
            }

            let mut to_read = PLAY_CHUNK.min((data_size - total) as usize);
            to_read -= to_read % 2;
            if to_read == 0 {
                break;
            }

            let n = file.read(&mut buf[..to_read])?;
            if n == 0 {
                // payload shorter than the declared data size
                break;
            }

            if scale < 1.0 {
                scale_samples(&mut buf[..n], scale);
            }

            out.write(&buf[..n]).map_err(|e| StreamError::Hardware(e.to_string()))?;

            total += n as u64;
            self.handle.add_bytes_done(n as u64);
        }

        drop(out);
        Ok(format!("Finished: {}", self.path.display()))
    }
}

/// Rescale 16-bit little-endian signed samples in place.
pub(crate) fn scale_samples(buf: &mut [u8], scale: f32) {
    for pair in buf.chunks_exact_mut(2) {
        let sample = i16::from_le_bytes([pair[0], pair[1]]);
        let scaled = (sample as f32 * scale) as i32;
        let scaled = scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        pair.copy_from_slice(&scaled.to_le_bytes());
    }
}
