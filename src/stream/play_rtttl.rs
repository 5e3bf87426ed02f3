//! Ringtone playback session: parse the tune, then key the tone
//! generator note by note.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::device::OutputDesc;
use crate::hal::HardwareBackend;
use crate::rtttl::{Tune, duty_for_volume};

use super::{OnComplete, StreamError, StreamHandle, StreamResult};

pub struct RtttlPlayback {
    tune: String,
    volume: u8,
    handle: Arc<StreamHandle>,
    output: OutputDesc,
    backend: Arc<dyn HardwareBackend>,
    on_complete: Option<OnComplete>,
}

impl RtttlPlayback {
    pub fn new(
        tune: String,
        volume: u8,
        handle: Arc<StreamHandle>,
        output: OutputDesc,
        backend: Arc<dyn HardwareBackend>,
        on_complete: Option<OnComplete>,
    ) -> Self {
        Self { tune, volume, handle, output, backend, on_complete }
    }

    /// Blocking run loop; the worker thread's entry point.
    pub fn run(mut self) {
        let result = self.stream();
        self.handle.deactivate();
        match &result {
            Ok(msg) => log::info!("RTTTL playback: {}", msg),
            Err(e) => log::error!("RTTTL playback error: {}", e),
        }
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(result);
        }
    }

    fn stream(&mut self) -> StreamResult {
        let tune = Tune::parse(&self.tune)?;
        let duty = duty_for_volume(self.volume);

        log::info!("RTTTL playback: '{}' (volume {}%)", tune.name, self.volume);

        let mut tone = self
            .backend
            .open_tone(&self.output)
            .map_err(|e| StreamError::Hardware(e.to_string()))?;

        for note in tune.notes() {
            // cancellation checkpoint, once per note
            if !self.handle.should_run() {
                log::info!("RTTTL playback stopped by request");
                break;
            }

            if note.freq_hz > 0.0 {
                tone.set_tone(note.freq_hz as u32, duty)
                    .map_err(|e| StreamError::Hardware(e.to_string()))?;
            }

            // Key for 90% of the note, silent for 10% as note separation.
            // A rest (freq 0) only silences.
            thread::sleep(Duration::from_millis((note.duration_ms as u64 * 9) / 10));
            tone.silence().map_err(|e| StreamError::Hardware(e.to_string()))?;
            thread::sleep(Duration::from_millis(note.duration_ms as u64 / 10));
        }

        let _ = tone.silence();
        drop(tone);
        Ok(format!("Finished: {}", tune.name))
    }
}
