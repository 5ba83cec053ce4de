//! Playback controller: one request in, at most one speaking session out.
//!
//! ```text
//!   Idle ──miss──▶ Loading ──parsed──▶ Ready ──▶ Playing ◀──▶ Paused
//!    │                │                             │            │
//!    └─────hit────────┼──────────▶ Ready            └── stop ────┴──▶ Idle
//!                     └── failure ──▶ Idle
//! ```
//!
//! Every `speak` call gets a generation number and a cancellation token. A
//! newer call stops the current session, cancels the older token and bumps
//! the generation, so a result that arrives late is cached but never played.

use crate::backends::{SynthesisBackend, VoiceCatalog};
use crate::cache::{AudioHandle, CacheEntry, ResponseCache};
use crate::error::ReadalongError;
use crate::fingerprint::SynthesisRequest;
use crate::parser::{parse_response, ParsedPayload};
use crate::player::{AudioPlayer, Playback};
use crate::synchronizer::{HighlightSink, HighlightTrack, PlaybackSynchronizer, SyncHandle};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
}

/// How a `speak` call settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// The request owns the active session.
    Playing { cached: bool },
    /// A newer request took over before this one could start playing.
    Superseded,
}

/// The audio currently loaded for playback and its highlight loop.
struct PlaybackSession {
    entry: Arc<CacheEntry>,
    playback: Arc<dyn Playback>,
    track: Arc<HighlightTrack>,
    playback_rate: f32,
    sync: Option<SyncHandle>,
}

impl PlaybackSession {
    fn halt(&mut self) {
        if let Some(sync) = self.sync.take() {
            sync.detach();
        }
        self.playback.stop();
    }
}

struct ControllerState {
    state: PlaybackState,
    generation: u64,
    pending: Option<CancellationToken>,
    session: Option<PlaybackSession>,
    last_audio: Option<AudioHandle>,
}

impl ControllerState {
    /// A session whose audio ran out is no longer playing. Its highlight loop
    /// clears the cursor and exits on its own.
    fn refresh(&mut self) {
        let ended = self
            .session
            .as_ref()
            .is_some_and(|session| session.playback.is_ended());
        if self.state == PlaybackState::Playing && ended {
            self.state = PlaybackState::Idle;
        }
    }
}

pub struct PlaybackController {
    backend: Arc<dyn SynthesisBackend>,
    player: Arc<dyn AudioPlayer>,
    highlighter: Arc<dyn HighlightSink>,
    synchronizer: PlaybackSynchronizer,
    cache: Mutex<ResponseCache>,
    inner: Mutex<ControllerState>,
}

impl PlaybackController {
    pub fn new(
        backend: Arc<dyn SynthesisBackend>,
        player: Arc<dyn AudioPlayer>,
        highlighter: Arc<dyn HighlightSink>,
        frame_interval: Duration,
    ) -> Self {
        Self {
            backend,
            player,
            highlighter,
            synchronizer: PlaybackSynchronizer::new(frame_interval),
            cache: Mutex::new(ResponseCache::new()),
            inner: Mutex::new(ControllerState {
                state: PlaybackState::Idle,
                generation: 0,
                pending: None,
                session: None,
                last_audio: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Synthesizes (or replays from cache) `request` and starts highlighted playback.
    pub async fn speak(
        &self,
        request: SynthesisRequest,
        playback_rate: f32,
    ) -> Result<SpeakOutcome, ReadalongError> {
        let request = request.normalized()?;
        let fingerprint = request.fingerprint();
        let (generation, cancel) = self.begin_request();

        let cached = self.cache().get(&fingerprint);
        let (entry, from_cache) = match cached {
            Some(entry) => {
                tracing::debug!(generation, "Replaying cached synthesis");
                (entry, true)
            }
            None => {
                self.transition(generation, PlaybackState::Loading);
                match self.fetch(&request, cancel).await {
                    Ok(parsed) => {
                        let (audio, timings) = parsed.into_parts();
                        let entry = self.cache().put(fingerprint, CacheEntry::new(audio, timings));
                        (entry, false)
                    }
                    Err(err) => return self.abandon(generation, err),
                }
            }
        };

        if !self.transition(generation, PlaybackState::Ready) {
            tracing::debug!(generation, "Result arrived for a superseded request");
            return Ok(SpeakOutcome::Superseded);
        }
        self.start_session(generation, &request.text, entry, playback_rate, from_cache)
            .await
    }

    /// Stops the current session and claims a new generation.
    fn begin_request(&self) -> (u64, CancellationToken) {
        let mut inner = self.lock();
        if let Some(pending) = inner.pending.take() {
            pending.cancel();
        }
        if let Some(mut session) = inner.session.take() {
            session.halt();
        }
        inner.generation += 1;
        inner.state = PlaybackState::Idle;

        let token = CancellationToken::new();
        inner.pending = Some(token.clone());
        (inner.generation, token)
    }

    /// Moves to `state` if `generation` is still the latest request.
    fn transition(&self, generation: u64, state: PlaybackState) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.state = state;
        true
    }

    async fn fetch(
        &self,
        request: &SynthesisRequest,
        cancel: CancellationToken,
    ) -> Result<ParsedPayload, ReadalongError> {
        let raw = self.backend.synthesize(request, cancel).await?;
        parse_response(&raw.content_type, &raw.body)
    }

    /// Settles a failed request. Failures of a superseded request are only logged.
    fn abandon(
        &self,
        generation: u64,
        err: ReadalongError,
    ) -> Result<SpeakOutcome, ReadalongError> {
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(generation, error = %err, "Superseded request failed");
            return Ok(SpeakOutcome::Superseded);
        }

        inner.state = PlaybackState::Idle;
        inner.pending = None;
        tracing::warn!(error = %err, "Synthesis failed");
        Err(err)
    }

    async fn start_session(
        &self,
        generation: u64,
        text: &str,
        entry: Arc<CacheEntry>,
        playback_rate: f32,
        from_cache: bool,
    ) -> Result<SpeakOutcome, ReadalongError> {
        let playback = match self.player.load(&entry.audio, playback_rate) {
            Ok(playback) => playback,
            Err(err) => return self.abandon(generation, err),
        };

        let track = if entry.has_word_timings() {
            HighlightTrack::words(text, entry.timings.clone())
        } else {
            // Sentence estimates need the audio length first
            match playback.duration().await {
                Ok(duration) => HighlightTrack::sentences(text, duration),
                Err(err) => {
                    playback.stop();
                    return self.abandon(generation, err);
                }
            }
        };
        let track = Arc::new(track);

        let mut inner = self.lock();
        if inner.generation != generation {
            playback.stop();
            return Ok(SpeakOutcome::Superseded);
        }

        playback.play();
        let sync = self
            .synchronizer
            .attach(playback.clone(), track.clone(), self.highlighter.clone());

        tracing::info!(
            generation,
            cached = from_cache,
            intervals = track.intervals().len(),
            kind = ?track.kind(),
            "Playback started"
        );

        inner.last_audio = Some(entry.audio.clone());
        inner.session = Some(PlaybackSession {
            entry,
            playback,
            track,
            playback_rate,
            sync: Some(sync),
        });
        inner.pending = None;
        inner.state = PlaybackState::Playing;
        Ok(SpeakOutcome::Playing { cached: from_cache })
    }

    /// Pauses a playing session or resumes a paused one.
    pub fn toggle_pause(&self) -> PlaybackState {
        let mut guard = self.lock();
        guard.refresh();
        let inner = &mut *guard;

        match (inner.state, inner.session.as_mut()) {
            (PlaybackState::Playing, Some(session)) => {
                session.playback.pause();
                if let Some(sync) = session.sync.take() {
                    sync.detach();
                }
                inner.state = PlaybackState::Paused;
            }
            (PlaybackState::Paused, Some(session)) => {
                session.playback.play();
                session.sync = Some(self.synchronizer.attach(
                    session.playback.clone(),
                    session.track.clone(),
                    self.highlighter.clone(),
                ));
                inner.state = PlaybackState::Playing;
            }
            _ => {}
        }
        inner.state
    }

    /// Stops playback and abandons any request still loading.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if let Some(pending) = inner.pending.take() {
            pending.cancel();
        }
        if let Some(mut session) = inner.session.take() {
            session.halt();
        }
        inner.generation += 1;
        inner.state = PlaybackState::Idle;
    }

    pub fn state(&self) -> PlaybackState {
        let mut inner = self.lock();
        inner.refresh();
        inner.state
    }

    /// Resolves once nothing is loading, playing or paused.
    pub async fn wait_until_finished(&self) {
        let mut ticker = tokio::time::interval(self.synchronizer.frame_interval());
        loop {
            ticker.tick().await;
            if self.state() == PlaybackState::Idle {
                break;
            }
        }
    }

    /// Cache entry backing the current session.
    pub fn current_entry(&self) -> Option<Arc<CacheEntry>> {
        self.lock().session.as_ref().map(|s| s.entry.clone())
    }

    pub fn playback_rate(&self) -> Option<f32> {
        self.lock().session.as_ref().map(|s| s.playback_rate)
    }

    /// Audio of the most recently started session, kept after it stops.
    pub fn last_audio(&self) -> Option<AudioHandle> {
        self.lock().last_audio.clone()
    }

    pub fn cached_responses(&self) -> usize {
        self.cache().len()
    }

    pub async fn list_voices(&self) -> Result<VoiceCatalog, ReadalongError> {
        self.backend.list_voices().await.map_err(|err| match err {
            ReadalongError::VoicesUnavailable(_) => err,
            other => ReadalongError::VoicesUnavailable(other.to_string()),
        })
    }
}
