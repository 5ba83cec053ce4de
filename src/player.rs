//! Audio output.
//!
//! [`AudioPlayer`] and [`Playback`] are the seam between the controller and
//! whatever actually makes sound. [`RodioPlayer`] is the default
//! implementation on top of `rodio`.

use crate::cache::AudioHandle;
use crate::error::ReadalongError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

/// One loaded piece of audio. Starts paused.
#[async_trait::async_trait]
pub trait Playback: Send + Sync {
    /// Total length in seconds, available once the audio metadata is known.
    async fn duration(&self) -> Result<f64, ReadalongError>;

    fn play(&self);

    fn pause(&self);

    /// Stops for good; the playback reports ended afterwards.
    fn stop(&self);

    /// Current media position in seconds.
    fn position(&self) -> f64;

    fn is_paused(&self) -> bool;

    fn is_ended(&self) -> bool;
}

pub trait AudioPlayer: Send + Sync {
    fn load(&self, audio: &AudioHandle, rate: f32) -> Result<Arc<dyn Playback>, ReadalongError>;
}

pub struct RodioPlayer {
    handle: OutputStreamHandle,
}

impl RodioPlayer {
    pub fn new() -> Result<Self, ReadalongError> {
        let (tx, rx) = std::sync::mpsc::channel();

        thread::spawn(move || {
            // Audio stream must live on this thread
            match OutputStream::try_default() {
                Ok((_stream, handle)) => {
                    if tx.send(Ok(handle)).is_err() {
                        return;
                    }
                    loop {
                        thread::park();
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e.to_string()));
                }
            }
        });

        let handle = rx
            .recv()
            .map_err(|e| ReadalongError::Playback(format!("Audio thread exited: {}", e)))?
            .map_err(|e| ReadalongError::Playback(format!("No audio output device: {}", e)))?;

        tracing::info!("Audio output initialized on default device");
        Ok(Self { handle })
    }
}

impl AudioPlayer for RodioPlayer {
    fn load(&self, audio: &AudioHandle, rate: f32) -> Result<Arc<dyn Playback>, ReadalongError> {
        let source = Decoder::new(Cursor::new(audio.clone()))
            .map_err(|e| ReadalongError::Playback(format!("Failed to decode: {}", e)))?;
        let sink = Sink::try_new(&self.handle)
            .map_err(|e| ReadalongError::Playback(format!("Failed to create sink: {}", e)))?;

        sink.pause();
        sink.set_speed(rate);
        sink.append(source.convert_samples::<f32>());

        tracing::debug!(bytes = audio.len(), rate, "Loaded audio");
        Ok(Arc::new(RodioPlayback {
            sink,
            audio: audio.clone(),
            rate: rate as f64,
            clock: Mutex::new(Clock::default()),
            duration: Mutex::new(None),
        }))
    }
}

/// Media clock: sink time is not observable, so it is derived from wall time.
#[derive(Default)]
struct Clock {
    played: f64,
    resumed_at: Option<Instant>,
}

struct RodioPlayback {
    sink: Sink,
    audio: AudioHandle,
    rate: f64,
    clock: Mutex<Clock>,
    duration: Mutex<Option<f64>>,
}

impl RodioPlayback {
    fn clock(&self) -> std::sync::MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn freeze_clock(&self) {
        let mut clock = self.clock();
        if let Some(resumed_at) = clock.resumed_at.take() {
            clock.played += resumed_at.elapsed().as_secs_f64() * self.rate;
        }
    }
}

/// Decodes the whole stream when the container does not declare a length.
fn measure_duration(audio: AudioHandle) -> Result<f64, ReadalongError> {
    let decoder = Decoder::new(Cursor::new(audio))
        .map_err(|e| ReadalongError::Playback(format!("Failed to decode: {}", e)))?;
    if let Some(total) = decoder.total_duration() {
        return Ok(total.as_secs_f64());
    }

    let channels = decoder.channels().max(1) as f64;
    let sample_rate = decoder.sample_rate().max(1) as f64;
    let samples = decoder.count() as f64;
    Ok(samples / channels / sample_rate)
}

#[async_trait::async_trait]
impl Playback for RodioPlayback {
    async fn duration(&self) -> Result<f64, ReadalongError> {
        if let Some(known) = *self.duration.lock().unwrap_or_else(PoisonError::into_inner) {
            return Ok(known);
        }

        let audio = self.audio.clone();
        let measured = tokio::task::spawn_blocking(move || measure_duration(audio))
            .await
            .map_err(|e| ReadalongError::Playback(format!("Error joining decode task: {}", e)))??;

        *self.duration.lock().unwrap_or_else(PoisonError::into_inner) = Some(measured);
        Ok(measured)
    }

    fn play(&self) {
        self.sink.play();
        let mut clock = self.clock();
        if clock.resumed_at.is_none() {
            clock.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&self) {
        self.sink.pause();
        self.freeze_clock();
    }

    fn stop(&self) {
        self.sink.stop();
        self.freeze_clock();
    }

    fn position(&self) -> f64 {
        let clock = self.clock();
        clock.played
            + clock
                .resumed_at
                .map(|t| t.elapsed().as_secs_f64() * self.rate)
                .unwrap_or(0.0)
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn is_ended(&self) -> bool {
        self.sink.empty()
    }
}
