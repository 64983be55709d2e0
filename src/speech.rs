//! Spoken/text feedback for user actions.
//!
//! A single [`SpeechService`] is built at startup and handed to the session;
//! it lives for the whole process. Output goes through an [`Announcer`] so the
//! terminal front end and tests can plug in their own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub trait Announcer: Send + Sync {
    fn announce(&self, text: &str);
}

/// Prints a cue line on stdout.
#[derive(Debug, Default)]
pub struct TerminalAnnouncer;

impl Announcer for TerminalAnnouncer {
    fn announce(&self, text: &str) {
        println!("[speak] {}", text);
    }
}

#[derive(Debug, Default)]
pub struct SilentAnnouncer;

impl Announcer for SilentAnnouncer {
    fn announce(&self, _text: &str) {}
}

/// Keeps every announcement; handy for asserting on feedback.
#[derive(Debug, Default, Clone)]
pub struct RecordingAnnouncer {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Announcer for RecordingAnnouncer {
    fn announce(&self, text: &str) {
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
    }
}

#[derive(Clone)]
pub struct SpeechService {
    enabled: Arc<AtomicBool>,
    announcer: Arc<dyn Announcer>,
}

impl SpeechService {
    /// Starts enabled.
    pub fn new(announcer: Arc<dyn Announcer>) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
            announcer,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Flips the flag and returns the new state.
    pub fn toggle(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn speak(&self, text: &str) {
        if self.is_enabled() {
            self.announcer.announce(text);
        }
    }
}

impl std::fmt::Debug for SpeechService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechService")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
