//! Recording session: capture PCM from the input and append it to a WAV
//! file in bounded chunks.
//!
//! The header is written up front with a placeholder payload size, since
//! the true length is unknown until the session ends and a seek-back
//! rewrite is costly on the target filesystem. The rewrite can be enabled
//! where storage seeks are cheap.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::device::InputDesc;
use crate::hal::HardwareBackend;
use crate::wav;

use super::{OnComplete, StreamError, StreamHandle, StreamResult};

/// 16 kHz is plenty for voice.
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;
pub const DEFAULT_MAX_DURATION_MS: u64 = 60_000;

/// Placeholder payload size written before the true length is known.
const PLACEHOLDER_DATA_SIZE: u32 = 1024 * 1024 * 1024;
/// Transfer unit for the capture pump.
const RECORD_CHUNK: usize = 1024;
/// Flush roughly every 2 seconds of 16 kHz mono audio to amortize
/// filesystem overhead.
const FLUSH_INTERVAL_BYTES: u64 = 64 * 1024;

pub struct Recording {
    path: PathBuf,
    duration_ms: u64,
    sample_rate: u32,
    fixup_header: bool,
    handle: Arc<StreamHandle>,
    input: InputDesc,
    backend: Arc<dyn HardwareBackend>,
    on_complete: Option<OnComplete>,
}

impl Recording {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path: PathBuf,
        duration_ms: Option<u64>,
        sample_rate: Option<u32>,
        fixup_header: bool,
        handle: Arc<StreamHandle>,
        input: InputDesc,
        backend: Arc<dyn HardwareBackend>,
        on_complete: Option<OnComplete>,
    ) -> Self {
        Self {
            path,
            duration_ms: duration_ms.unwrap_or(DEFAULT_MAX_DURATION_MS),
            sample_rate: sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
            fixup_header,
            handle,
            input,
            backend,
            on_complete,
        }
    }

    /// Blocking run loop; the worker thread's entry point.
    pub fn run(mut self) {
        let result = self.stream();
        self.handle.deactivate();
        match &result {
            Ok(msg) => log::info!("Recording: {}", msg),
            Err(e) => log::error!("Recording error: {}", e),
        }
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(result);
        }
    }

    fn stream(&mut self) -> StreamResult {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        {
            let mut file = File::create(&self.path)?;
            let header = wav::build_header(self.sample_rate, 1, 16, PLACEHOLDER_DATA_SIZE);
            file.write_all(&header)?;
        }

        log::info!(
            "Recording to {} ({} Hz, 16-bit, mono, max {} ms)",
            self.path.display(),
            self.sample_rate,
            self.duration_ms,
        );

        let mut input = self
            .backend
            .open_input(&self.input, self.sample_rate)
            .map_err(|e| StreamError::Hardware(e.to_string()))?;

        let max_bytes = self.duration_ms * self.sample_rate as u64 * 2 / 1000;
        let start = Instant::now();

        let mut file = BufWriter::new(OpenOptions::new().append(true).open(&self.path)?);
        let mut buf = [0u8; RECORD_CHUNK];
        let mut bytes_since_flush: u64 = 0;

        while self.handle.should_run() && self.handle.bytes_done() < max_bytes {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            if elapsed_ms >= self.duration_ms {
                log::info!("Recording duration limit reached ({} ms)", elapsed_ms);
                break;
            }

            let n = match input.read(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    // keep what was captured so far
                    log::warn!("Recording read error: {}, stopping early", e);
                    break;
                }
            };

            if n > 0 {
                file.write_all(&buf[..n])?;
                self.handle.add_bytes_done(n as u64);
                bytes_since_flush += n as u64;

                if bytes_since_flush >= FLUSH_INTERVAL_BYTES {
                    file.flush()?;
                    log::debug!("Recording flushed {} bytes", bytes_since_flush);
                    bytes_since_flush = 0;
                }
            }
        }

        file.flush()?;
        drop(file);
        drop(input);

        let bytes_recorded = self.handle.bytes_done();
        if self.fixup_header {
            rewrite_header_sizes(&self.path, bytes_recorded as u32)?;
        }

        log::info!("Recording finished: {} bytes", bytes_recorded);
        Ok(format!("Recorded: {}", self.path.display()))
    }
}

/// Patch the RIFF and data sizes once the true payload length is known.
fn rewrite_header_sizes(path: &PathBuf, data_size: u32) -> Result<(), StreamError> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(4))?;
    file.write_all(&(data_size + 36).to_le_bytes())?;
    file.seek(SeekFrom::Start(40))?;
    file.write_all(&data_size.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("audiocore-record-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn header_rewrite_patches_both_sizes() {
        let path = temp_path("fixup.wav");
        {
            let mut file = File::create(&path).unwrap();
            file.write_all(&wav::build_header(16000, 1, 16, PLACEHOLDER_DATA_SIZE)).unwrap();
            file.write_all(&[0u8; 320]).unwrap();
        }
        rewrite_header_sizes(&path, 320).unwrap();

        let mut contents = Vec::new();
        File::open(&path).unwrap().read_to_end(&mut contents).unwrap();
        assert_eq!(u32::from_le_bytes(contents[4..8].try_into().unwrap()), 320 + 36);
        assert_eq!(u32::from_le_bytes(contents[40..44].try_into().unwrap()), 320);
        fs::remove_file(&path).ok();
    }
}
