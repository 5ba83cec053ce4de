//! Audio player and highlight sink doubles.

use readalong::cache::AudioHandle;
use readalong::player::{AudioPlayer, Playback};
use readalong::synchronizer::{Highlight, HighlightSink};
use readalong::ReadalongError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Playback whose position is set by the test instead of a clock.
pub struct ScriptedPlayback {
    pub audio: AudioHandle,
    pub rate: f32,
    duration: f64,
    position: AtomicU64,
    paused: AtomicBool,
    ended: AtomicBool,
}

impl ScriptedPlayback {
    pub fn seek(&self, seconds: f64) {
        self.position.store(seconds.to_bits(), Ordering::SeqCst);
    }

    /// Simulates the audio running out.
    pub fn finish(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Playback for ScriptedPlayback {
    async fn duration(&self) -> Result<f64, ReadalongError> {
        Ok(self.duration)
    }

    fn play(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }

    fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::SeqCst))
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

/// Hands out [`ScriptedPlayback`]s of a fixed duration and keeps every one it created.
pub struct ScriptedPlayer {
    duration: f64,
    loaded: Mutex<Vec<Arc<ScriptedPlayback>>>,
}

impl ScriptedPlayer {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            loaded: Mutex::new(Vec::new()),
        }
    }

    pub fn loaded(&self) -> Vec<Arc<ScriptedPlayback>> {
        self.loaded.lock().unwrap().clone()
    }

    pub fn last(&self) -> Arc<ScriptedPlayback> {
        self.loaded().last().cloned().expect("nothing was loaded")
    }
}

impl AudioPlayer for ScriptedPlayer {
    fn load(&self, audio: &AudioHandle, rate: f32) -> Result<Arc<dyn Playback>, ReadalongError> {
        let playback = Arc::new(ScriptedPlayback {
            audio: audio.clone(),
            rate,
            duration: self.duration,
            position: AtomicU64::new(0f64.to_bits()),
            paused: AtomicBool::new(true),
            ended: AtomicBool::new(false),
        });
        self.loaded.lock().unwrap().push(playback.clone());
        Ok(playback)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    seen: Mutex<Vec<Option<Highlight>>>,
}

impl RecordingSink {
    pub fn labels(&self) -> Vec<Option<String>> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|h| h.as_ref().map(|h| h.label.clone()))
            .collect()
    }

    pub fn last(&self) -> Option<Highlight> {
        self.seen.lock().unwrap().last().cloned().flatten()
    }
}

impl HighlightSink for RecordingSink {
    fn highlight(&self, highlight: Option<&Highlight>) {
        self.seen.lock().unwrap().push(highlight.cloned());
    }
}
