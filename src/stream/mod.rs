//! Stream sessions: one playback or recording plus its hardware lease,
//! shared status flags, and worker-thread run loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use thiserror::Error;

mod play_rtttl;
mod play_wav;
mod record;

pub use play_rtttl::RtttlPlayback;
pub use play_wav::WavPlayback;
pub use record::{DEFAULT_MAX_DURATION_MS, DEFAULT_SAMPLE_RATE, Recording};

/// Logical sound source class. The ordinal value is the priority:
/// `Music < Notification < Alarm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StreamType {
    Music = 0,
    Notification = 1,
    Alarm = 2,
}

/// Failures a stream can hit while opening or pumping data.
///
/// These never cross back to the caller's thread; the worker converts
/// them into the completion callback's `Err` arm.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Malformed or unsupported WAV/RTTTL input.
    #[error("format: {0}")]
    Format(&'static str),
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
    /// Hardware open or transfer failure.
    #[error("hardware: {0}")]
    Hardware(String),
}

/// Outcome delivered to the completion callback: a human-readable
/// completion message, or the error that ended the stream.
pub type StreamResult = Result<String, StreamError>;

/// Completion callback, invoked exactly once from the worker thread
/// after the stream's hardware handle has been released.
pub type OnComplete = Box<dyn FnOnce(StreamResult) + Send + 'static>;

/// Status block shared between a stream's worker thread and the engine.
///
/// The worker is the sole writer of the byte counters; the engine's
/// control thread only reads status or flips `keep_running`. Cancellation
/// is cooperative: the worker checks the flag once per chunk or per note.
pub struct StreamHandle {
    keep_running: AtomicBool,
    active: AtomicBool,
    bytes_done: AtomicU64,
    bytes_total: AtomicU64,
}

impl StreamHandle {
    /// Create a handle already marked active. The engine activates the
    /// session at grant time, under its lock, so a request arriving
    /// before the worker's first instruction still sees the slot as
    /// occupied.
    pub fn new_active() -> Arc<Self> {
        Arc::new(Self {
            keep_running: AtomicBool::new(true),
            active: AtomicBool::new(true),
            bytes_done: AtomicU64::new(0),
            bytes_total: AtomicU64::new(0),
        })
    }

    /// Request cancellation. Fire-and-forget; the worker honors it at
    /// its next checkpoint.
    pub fn stop(&self) {
        self.keep_running.store(false, Ordering::SeqCst);
    }

    pub fn should_run(&self) -> bool {
        self.keep_running.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub(crate) fn set_total_bytes(&self, total: u64) {
        self.bytes_total.store(total, Ordering::Relaxed);
    }

    pub(crate) fn add_bytes_done(&self, n: u64) {
        self.bytes_done.fetch_add(n, Ordering::Relaxed);
    }

    pub fn bytes_done(&self) -> u64 {
        self.bytes_done.load(Ordering::Relaxed)
    }

    /// Progress through the payload, 0.0 to 100.0, if the total is known.
    pub fn progress_percent(&self) -> Option<f32> {
        let total = self.bytes_total.load(Ordering::Relaxed);
        if total == 0 {
            return None;
        }
        Some(self.bytes_done() as f32 * 100.0 / total as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_type_priority_order() {
        assert!(StreamType::Music < StreamType::Notification);
        assert!(StreamType::Notification < StreamType::Alarm);
    }

    #[test]
    fn handle_stop_flips_keep_running() {
        let h = StreamHandle::new_active();
        assert!(h.should_run());
        assert!(h.is_active());
        h.stop();
        assert!(!h.should_run());
        // stop() only requests cancellation; active is cleared by the worker
        assert!(h.is_active());
    }

    #[test]
    fn handle_progress_needs_total() {
        let h = StreamHandle::new_active();
        h.add_bytes_done(100);
        assert_eq!(h.progress_percent(), None);
        h.set_total_bytes(400);
        assert_eq!(h.progress_percent(), Some(25.0));
    }
}
