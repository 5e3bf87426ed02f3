//! The audio engine: descriptor registry, system volume, and the single
//! playback/recording slots arbitrated by stream priority.
//!
//! Control methods run on the caller's thread and never block for the
//! duration of a stream. Each accepted request spawns one dedicated
//! worker thread (NOT an async task: real-time audio I/O must not
//! contend with other schedulers) that runs the stream's blocking loop
//! to completion and then clears the engine's slot.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::Result;

use crate::config::{BackendKind, EngineConfig};
use crate::device::{InputDesc, InputKind, OutputDesc, OutputKind};
use crate::hal::{HardwareBackend, SimBackend};
use crate::stream::{
    OnComplete, Recording, RtttlPlayback, StreamHandle, StreamType, WavPlayback,
};

const DEFAULT_VOLUME: u8 = 70;

struct PlaybackSlot {
    stream_type: StreamType,
    output_kind: OutputKind,
    handle: Arc<StreamHandle>,
}

struct RecordingSlot {
    sample_rate: u32,
    handle: Arc<StreamHandle>,
}

#[derive(Default)]
struct EngineInner {
    outputs: Vec<OutputDesc>,
    inputs: Vec<InputDesc>,
    playback: Option<PlaybackSlot>,
    recording: Option<RecordingSlot>,
}

/// Central audio service. Construct one at the application's composition
/// root and share it; there is no process-wide instance.
pub struct AudioEngine {
    backend: Arc<dyn HardwareBackend>,
    volume: AtomicU8,
    fixup_wav_header: bool,
    inner: Arc<Mutex<EngineInner>>,
}

impl AudioEngine {
    pub fn new(backend: Arc<dyn HardwareBackend>) -> Self {
        Self {
            backend,
            volume: AtomicU8::new(DEFAULT_VOLUME),
            fixup_wav_header: false,
            inner: Arc::new(Mutex::new(EngineInner::default())),
        }
    }

    /// Build an engine from a board configuration: backend selection,
    /// descriptor registration, and defaults in one step.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let backend: Arc<dyn HardwareBackend> = match config.backend {
            BackendKind::Sim => Arc::new(SimBackend),
            #[cfg(feature = "alsa")]
            BackendKind::Alsa => Arc::new(crate::hal::AlsaBackend),
            #[cfg(not(feature = "alsa"))]
            BackendKind::Alsa => {
                anyhow::bail!("alsa backend not compiled in (enable the `alsa` feature)")
            }
        };

        let mut engine = Self::new(backend);
        engine.fixup_wav_header = config.fixup_wav_header;
        engine.set_volume(config.volume as i32);
        engine.configure(config.outputs.clone(), config.inputs.clone())?;
        Ok(engine)
    }

    /// Register hardware descriptors, once at boot. Capability queries
    /// and play/record requests reflect the registered set.
    pub fn configure(&self, outputs: Vec<OutputDesc>, inputs: Vec<InputDesc>) -> Result<()> {
        for output in &outputs {
            output.validate()?;
        }

        let mut inner = self.inner.lock().unwrap();
        log::info!(
            "AudioEngine configured: {} output(s), {} input(s)",
            outputs.len(),
            inputs.len(),
        );
        inner.outputs = outputs;
        inner.inputs = inputs;
        Ok(())
    }

    pub fn has_output_kind(&self, kind: OutputKind) -> bool {
        self.inner.lock().unwrap().outputs.iter().any(|o| o.kind == kind)
    }

    pub fn has_input_kind(&self, kind: InputKind) -> bool {
        self.inner.lock().unwrap().inputs.iter().any(|i| i.kind == kind)
    }

    /// Start WAV playback on the serial-bus output.
    ///
    /// Returns `false` (never panics, never raises) when no I2S output
    /// is registered, a recording holds the shared bus, or audio focus
    /// rejects the request. Returns `true` once the worker is spawned;
    /// completion is reported through `on_complete`.
    pub fn play_wav(
        &self,
        path: impl Into<PathBuf>,
        stream_type: StreamType,
        volume: Option<u8>,
        on_complete: Option<OnComplete>,
    ) -> bool {
        let mut inner = self.inner.lock().unwrap();

        let Some(output) = inner.outputs.iter().find(|o| o.kind == OutputKind::I2s).cloned()
        else {
            log::warn!("play_wav failed: no I2S output registered");
            return false;
        };

        // Playback and capture share one serial bus
        if inner.recording.as_ref().is_some_and(|r| r.handle.is_active()) {
            log::warn!("play_wav rejected: recording active on the shared bus");
            return false;
        }

        if !grant_focus(&inner, stream_type) {
            return false;
        }

        let handle = StreamHandle::new_active();
        let volume = volume.unwrap_or_else(|| self.get_volume());
        let stream = WavPlayback::new(
            path.into(),
            volume,
            handle.clone(),
            output,
            self.backend.clone(),
            on_complete,
        );

        inner.playback = Some(PlaybackSlot {
            stream_type,
            output_kind: OutputKind::I2s,
            handle: handle.clone(),
        });
        drop(inner);

        self.spawn_playback_worker("audio-play", handle, move || stream.run())
    }

    /// Start RTTTL ringtone playback on the tone generator.
    ///
    /// Same contract as [`play_wav`](Self::play_wav); the buzzer does not
    /// sit on the serial bus, so an active recording is no obstacle.
    pub fn play_rtttl(
        &self,
        tune: impl Into<String>,
        stream_type: StreamType,
        volume: Option<u8>,
        on_complete: Option<OnComplete>,
    ) -> bool {
        let mut inner = self.inner.lock().unwrap();

        let Some(output) = inner.outputs.iter().find(|o| o.kind == OutputKind::Buzzer).cloned()
        else {
            log::warn!("play_rtttl failed: no buzzer output registered");
            return false;
        };

        if !grant_focus(&inner, stream_type) {
            return false;
        }

        let handle = StreamHandle::new_active();
        let volume = volume.unwrap_or_else(|| self.get_volume());
        let stream = RtttlPlayback::new(
            tune.into(),
            volume,
            handle.clone(),
            output,
            self.backend.clone(),
            on_complete,
        );

        inner.playback = Some(PlaybackSlot {
            stream_type,
            output_kind: OutputKind::Buzzer,
            handle: handle.clone(),
        });
        drop(inner);

        self.spawn_playback_worker("audio-tone", handle, move || stream.run())
    }

    /// Start recording from the serial-bus input into a WAV file.
    ///
    /// Returns `false` when no input is registered, a recording is
    /// already active, or a playback holds the shared bus.
    pub fn record_wav(
        &self,
        path: impl Into<PathBuf>,
        duration_ms: Option<u64>,
        sample_rate: Option<u32>,
        on_complete: Option<OnComplete>,
    ) -> bool {
        let mut inner = self.inner.lock().unwrap();

        let Some(input) = inner.inputs.first().cloned() else {
            log::warn!("record_wav failed: no input registered");
            return false;
        };

        if inner.recording.as_ref().is_some_and(|r| r.handle.is_active()) {
            log::warn!("record_wav rejected: recording already active");
            return false;
        }

        // The bus carries either playback or capture, never both
        if inner
            .playback
            .as_ref()
            .is_some_and(|p| p.handle.is_active() && p.output_kind == OutputKind::I2s)
        {
            log::warn!("record_wav rejected: playback active on the shared bus");
            return false;
        }

        let sample_rate = sample_rate.unwrap_or(crate::stream::DEFAULT_SAMPLE_RATE);
        let handle = StreamHandle::new_active();
        let stream = Recording::new(
            path.into(),
            duration_ms,
            Some(sample_rate),
            self.fixup_wav_header,
            handle.clone(),
            input,
            self.backend.clone(),
            on_complete,
        );

        inner.recording = Some(RecordingSlot { sample_rate, handle: handle.clone() });
        drop(inner);

        self.spawn_recording_worker(handle, move || stream.run())
    }

    /// Request cancellation of whatever is active. Fire-and-forget:
    /// returns immediately, workers exit at their next checkpoint and
    /// report through their completion callbacks. Safe when idle.
    pub fn stop(&self) {
        let inner = self.inner.lock().unwrap();
        match &inner.playback {
            Some(slot) => {
                slot.handle.stop();
                log::info!("stop: playback cancellation requested");
            }
            None => log::debug!("stop: no active playback"),
        }
        match &inner.recording {
            Some(slot) => {
                slot.handle.stop();
                log::info!("stop: recording cancellation requested");
            }
            None => log::debug!("stop: no active recording"),
        }
    }

    /// Neither built-in stream kind can suspend; this only diagnoses.
    pub fn pause(&self) {
        let inner = self.inner.lock().unwrap();
        if inner.playback.as_ref().is_some_and(|s| s.handle.is_active()) {
            log::warn!("pause not supported for the built-in stream kinds");
        } else {
            log::info!("pause: no active playback");
        }
    }

    /// Counterpart of [`pause`](Self::pause); also a diagnostic no-op.
    pub fn resume(&self) {
        let inner = self.inner.lock().unwrap();
        if inner.playback.as_ref().is_some_and(|s| s.handle.is_active()) {
            log::warn!("resume not supported for the built-in stream kinds");
        } else {
            log::info!("resume: no active playback");
        }
    }

    /// Set the system volume, clamped to 0..100. Applies to streams
    /// started after the call; an active stream keeps the volume it was
    /// constructed with.
    pub fn set_volume(&self, volume: i32) {
        self.volume.store(volume.clamp(0, 100) as u8, Ordering::Relaxed);
    }

    pub fn get_volume(&self) -> u8 {
        self.volume.load(Ordering::Relaxed)
    }

    pub fn is_playing(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.playback.as_ref().is_some_and(|s| s.handle.is_active())
    }

    pub fn is_recording(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.recording.as_ref().is_some_and(|s| s.handle.is_active())
    }

    /// Progress of the current WAV playback through its payload, if any.
    pub fn playback_progress_percent(&self) -> Option<f32> {
        let inner = self.inner.lock().unwrap();
        inner.playback.as_ref().and_then(|s| s.handle.progress_percent())
    }

    /// Elapsed time of the current recording, derived from captured bytes.
    pub fn recording_elapsed_ms(&self) -> Option<u64> {
        let inner = self.inner.lock().unwrap();
        inner
            .recording
            .as_ref()
            .map(|s| s.handle.bytes_done() * 1000 / (s.sample_rate as u64 * 2))
    }

    fn spawn_playback_worker(
        &self,
        name: &str,
        handle: Arc<StreamHandle>,
        run: impl FnOnce() + Send + 'static,
    ) -> bool {
        let inner = Arc::clone(&self.inner);
        let worker_handle = handle.clone();
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            run();
            // Clear the slot unless a replacement has already taken it
            let mut guard = inner.lock().unwrap();
            if guard
                .playback
                .as_ref()
                .is_some_and(|slot| Arc::ptr_eq(&slot.handle, &worker_handle))
            {
                guard.playback = None;
            }
        });

        match spawned {
            Ok(_) => true,
            Err(e) => {
                log::error!("failed to spawn {} worker: {}", name, e);
                let mut guard = self.inner.lock().unwrap();
                if guard
                    .playback
                    .as_ref()
                    .is_some_and(|slot| Arc::ptr_eq(&slot.handle, &handle))
                {
                    guard.playback = None;
                }
                false
            }
        }
    }

    fn spawn_recording_worker(
        &self,
        handle: Arc<StreamHandle>,
        run: impl FnOnce() + Send + 'static,
    ) -> bool {
        let inner = Arc::clone(&self.inner);
        let worker_handle = handle.clone();
        let spawned = thread::Builder::new().name("audio-record".to_string()).spawn(move || {
            run();
            let mut guard = inner.lock().unwrap();
            if guard
                .recording
                .as_ref()
                .is_some_and(|slot| Arc::ptr_eq(&slot.handle, &worker_handle))
            {
                guard.recording = None;
            }
        });

        match spawned {
            Ok(_) => true,
            Err(e) => {
                log::error!("failed to spawn audio-record worker: {}", e);
                let mut guard = self.inner.lock().unwrap();
                if guard
                    .recording
                    .as_ref()
                    .is_some_and(|slot| Arc::ptr_eq(&slot.handle, &handle))
                {
                    guard.recording = None;
                }
                false
            }
        }
    }
}

/// Single-slot priority gate. A request is granted when nothing holds
/// the slot, the occupant has finished, or the request strictly outranks
/// it (the occupant is stopped first). A rejected request is dropped,
/// never queued.
fn grant_focus(inner: &EngineInner, requested: StreamType) -> bool {
    let Some(slot) = &inner.playback else {
        return true;
    };
    if !slot.handle.is_active() {
        return true;
    }
    if requested > slot.stream_type {
        log::info!(
            "audio focus: interrupting {:?} for {:?}",
            slot.stream_type,
            requested,
        );
        slot.handle.stop();
        return true;
    }
    log::info!(
        "audio focus: {:?} rejected while {:?} is active",
        requested,
        slot.stream_type,
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{I2sInPins, I2sOutPins};
    use crate::stream::StreamError;
    use crate::wav;
    use std::fs::File;
    use std::io::Write;
    use std::sync::mpsc;
    use std::time::Duration;

    fn speaker() -> OutputDesc {
        OutputDesc::i2s("speaker", I2sOutPins { sck: 5, ws: 6, sd: 7, mck: None })
    }

    fn buzzer() -> OutputDesc {
        OutputDesc::buzzer("buzzer", 4)
    }

    fn mic() -> InputDesc {
        InputDesc::i2s("mic", I2sInPins { sck: 5, ws: 6, sd_in: 8 })
    }

    fn engine_with(outputs: Vec<OutputDesc>, inputs: Vec<InputDesc>) -> AudioEngine {
        let engine = AudioEngine::new(Arc::new(SimBackend));
        engine.configure(outputs, inputs).unwrap();
        engine
    }

    fn completion() -> (Option<OnComplete>, mpsc::Receiver<crate::stream::StreamResult>) {
        let (tx, rx) = mpsc::channel();
        let cb: OnComplete = Box::new(move |result| {
            tx.send(result).ok();
        });
        (Some(cb), rx)
    }

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("audiocore-engine-{}-{}", std::process::id(), name));
        path
    }

    /// Write a 16 kHz mono 16-bit WAV of silence, `tenths` tenths of a
    /// second long.
    fn write_wav(name: &str, tenths: u32) -> PathBuf {
        let data_len = 16000 * 2 * tenths / 10;
        let path = temp_path(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(&wav::build_header(16000, 1, 16, data_len)).unwrap();
        file.write_all(&vec![0u8; data_len as usize]).unwrap();
        path
    }

    // An 8-note tune at one second per note: long enough that it is
    // still active when the test issues competing requests.
    const HOLD_TUNE: &str = "Hold:d=4,o=5,b=60:c,c,c,c,c,c,c,c";
    // Fast tune that finishes in well under a second.
    const QUICK_TUNE: &str = "Quick:d=32,o=5,b=450:c,d,e";

    #[test]
    fn default_volume_and_clamping() {
        let engine = engine_with(vec![], vec![]);
        assert_eq!(engine.get_volume(), 70);
        engine.set_volume(150);
        assert_eq!(engine.get_volume(), 100);
        engine.set_volume(-10);
        assert_eq!(engine.get_volume(), 0);
        engine.set_volume(55);
        assert_eq!(engine.get_volume(), 55);
    }

    #[test]
    fn capability_queries_reflect_descriptors() {
        let engine = engine_with(vec![speaker()], vec![mic()]);
        assert!(engine.has_output_kind(OutputKind::I2s));
        assert!(!engine.has_output_kind(OutputKind::Buzzer));
        assert!(engine.has_input_kind(InputKind::I2s));

        let bare = engine_with(vec![], vec![]);
        assert!(!bare.has_output_kind(OutputKind::I2s));
        assert!(!bare.has_input_kind(InputKind::I2s));
    }

    #[test]
    fn play_wav_without_i2s_output_fails() {
        let engine = engine_with(vec![buzzer()], vec![]);
        assert!(!engine.play_wav("/nonexistent.wav", StreamType::Music, None, None));
        assert!(!engine.is_playing());
    }

    #[test]
    fn play_rtttl_without_buzzer_fails() {
        let engine = engine_with(vec![speaker()], vec![]);
        assert!(!engine.play_rtttl(QUICK_TUNE, StreamType::Notification, None, None));
        assert!(!engine.is_playing());
    }

    #[test]
    fn record_without_input_fails() {
        let engine = engine_with(vec![speaker()], vec![]);
        assert!(!engine.record_wav(temp_path("no-input.wav"), Some(100), None, None));
        assert!(!engine.is_recording());
    }

    #[test]
    fn stop_when_idle_is_safe() {
        let engine = engine_with(vec![speaker(), buzzer()], vec![mic()]);
        engine.stop();
        engine.stop();
        engine.pause();
        engine.resume();
        assert!(!engine.is_playing());
        assert!(!engine.is_recording());
    }

    #[test]
    fn quick_tune_completes_and_releases_focus() {
        let engine = engine_with(vec![buzzer()], vec![]);
        let (cb, rx) = completion();
        assert!(engine.play_rtttl(QUICK_TUNE, StreamType::Notification, None, cb));

        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(result.unwrap().contains("Quick"));

        // Slot holder has finished: an equal-priority request is granted
        let (cb2, rx2) = completion();
        assert!(engine.play_rtttl(QUICK_TUNE, StreamType::Notification, None, cb2));
        rx2.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
    }

    #[test]
    fn focus_rejects_equal_and_lower_priority() {
        let engine = engine_with(vec![buzzer()], vec![]);
        let (cb, rx) = completion();
        assert!(engine.play_rtttl(HOLD_TUNE, StreamType::Notification, None, cb));
        assert!(engine.is_playing());

        // Lower and equal priority are dropped; the holder keeps running
        assert!(!engine.play_rtttl(QUICK_TUNE, StreamType::Music, None, None));
        assert!(!engine.play_rtttl(QUICK_TUNE, StreamType::Notification, None, None));
        assert!(engine.is_playing());

        engine.stop();
        rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
    }

    #[test]
    fn focus_grants_higher_priority_and_stops_holder() {
        let engine = engine_with(vec![buzzer()], vec![]);
        let (cb_low, rx_low) = completion();
        assert!(engine.play_rtttl(HOLD_TUNE, StreamType::Music, None, cb_low));

        let (cb_high, rx_high) = completion();
        assert!(engine.play_rtttl(HOLD_TUNE, StreamType::Alarm, None, cb_high));

        // The interrupted stream ends on its own (within one note)
        rx_low.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        // The alarm is still the active occupant
        assert!(engine.is_playing());

        engine.stop();
        rx_high.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
    }

    #[test]
    fn record_rejected_while_wav_playback_holds_the_bus() {
        let engine = engine_with(vec![speaker()], vec![mic()]);
        let wav_path = write_wav("bus-hold.wav", 10);
        let (cb, rx) = completion();
        assert!(engine.play_wav(&wav_path, StreamType::Music, None, cb));

        assert!(!engine.record_wav(temp_path("bus-reject.wav"), Some(100), None, None));

        engine.stop();
        rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        std::fs::remove_file(&wav_path).ok();
    }

    #[test]
    fn play_wav_rejected_while_recording_holds_the_bus() {
        let engine = engine_with(vec![speaker()], vec![mic()]);
        let rec_path = temp_path("bus-rec.wav");
        let (cb, rx) = completion();
        assert!(engine.record_wav(&rec_path, Some(1500), None, cb));
        assert!(engine.is_recording());

        let wav_path = write_wav("bus-playback.wav", 1);
        assert!(!engine.play_wav(&wav_path, StreamType::Alarm, None, None));

        engine.stop();
        rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        std::fs::remove_file(&rec_path).ok();
        std::fs::remove_file(&wav_path).ok();
    }

    #[test]
    fn second_recording_is_rejected() {
        let engine = engine_with(vec![], vec![mic()]);
        let rec_path = temp_path("rec-first.wav");
        let (cb, rx) = completion();
        assert!(engine.record_wav(&rec_path, Some(1000), None, cb));
        assert!(!engine.record_wav(temp_path("rec-second.wav"), Some(1000), None, None));

        engine.stop();
        rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        std::fs::remove_file(&rec_path).ok();
    }

    #[test]
    fn recording_does_not_block_the_buzzer() {
        let engine = engine_with(vec![buzzer()], vec![mic()]);
        let rec_path = temp_path("rec-buzzer.wav");
        let (cb_rec, rx_rec) = completion();
        assert!(engine.record_wav(&rec_path, Some(600), None, cb_rec));

        let (cb_ring, rx_ring) = completion();
        assert!(engine.play_rtttl(QUICK_TUNE, StreamType::Notification, None, cb_ring));

        rx_ring.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        rx_rec.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        std::fs::remove_file(&rec_path).ok();
    }

    #[test]
    fn wav_playback_completes_with_message() {
        let engine = engine_with(vec![speaker()], vec![]);
        let wav_path = write_wav("complete.wav", 2);
        let (cb, rx) = completion();
        assert!(engine.play_wav(&wav_path, StreamType::Music, Some(50), cb));

        let message = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert!(message.contains("Finished"));
        std::fs::remove_file(&wav_path).ok();
    }

    #[test]
    fn stereo_wav_errors_through_callback() {
        let engine = engine_with(vec![speaker()], vec![]);
        let path = temp_path("stereo.wav");
        let mut file = File::create(&path).unwrap();
        file.write_all(&wav::build_header(16000, 2, 16, 64)).unwrap();
        file.write_all(&[0u8; 64]).unwrap();
        drop(file);

        let (cb, rx) = completion();
        assert!(engine.play_wav(&path, StreamType::Music, None, cb));
        let err = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap_err();
        assert!(matches!(err, StreamError::Format("only mono supported")));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn eight_bit_wav_errors_through_callback() {
        let engine = engine_with(vec![speaker()], vec![]);
        let path = temp_path("8bit.wav");
        let mut file = File::create(&path).unwrap();
        file.write_all(&wav::build_header(16000, 1, 8, 64)).unwrap();
        file.write_all(&[0u8; 64]).unwrap();
        drop(file);

        let (cb, rx) = completion();
        assert!(engine.play_wav(&path, StreamType::Music, None, cb));
        let err = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap_err();
        assert!(matches!(err, StreamError::Format("only 16-bit PCM supported")));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn wav_without_data_chunk_errors_through_callback() {
        let engine = engine_with(vec![speaker()], vec![]);
        let path = temp_path("nodata.wav");
        let mut file = File::create(&path).unwrap();
        let mut header = wav::build_header(16000, 1, 16, 0).to_vec();
        header.truncate(36);
        let riff_len = (header.len() as u32) - 8;
        header[4..8].copy_from_slice(&riff_len.to_le_bytes());
        file.write_all(&header).unwrap();
        drop(file);

        let (cb, rx) = completion();
        assert!(engine.play_wav(&path, StreamType::Music, None, cb));
        let err = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap_err();
        assert!(matches!(err, StreamError::Format("no data chunk found")));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn recording_writes_placeholder_header_and_payload() {
        let engine = engine_with(vec![], vec![mic()]);
        let rec_path = temp_path("rec-header.wav");
        let (cb, rx) = completion();
        assert!(engine.record_wav(&rec_path, Some(200), None, cb));

        let message = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert!(message.contains("Recorded"));

        let contents = std::fs::read(&rec_path).unwrap();
        assert_eq!(&contents[0..4], b"RIFF");
        assert_eq!(&contents[36..40], b"data");
        // placeholder size stays in place; the rewrite is off by default
        assert_eq!(
            u32::from_le_bytes(contents[40..44].try_into().unwrap()),
            1024 * 1024 * 1024,
        );
        assert!(contents.len() > wav::HEADER_LEN);
        std::fs::remove_file(&rec_path).ok();
    }

    #[test]
    fn recording_respects_duration_cap() {
        let engine = engine_with(vec![], vec![mic()]);
        let rec_path = temp_path("rec-cap.wav");
        let (cb, rx) = completion();
        assert!(engine.record_wav(&rec_path, Some(200), Some(16000), cb));

        rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        let contents = std::fs::read(&rec_path).unwrap();
        // 200 ms at 16 kHz mono 16-bit is 6400 payload bytes; the byte
        // cap allows at most one chunk of overshoot
        let payload = contents.len() - wav::HEADER_LEN;
        assert!(payload <= 6400 + 1024, "payload {} too large", payload);
        assert!(payload > 0);
        std::fs::remove_file(&rec_path).ok();
    }
}
