//! Highlight cursor driven by the playback position.

use crate::player::Playback;
use crate::timing::{estimate_sentence_timings, split_segments, TimingInterval, WordTiming};
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// First interval containing `position`. Overlaps resolve to the earliest entry.
pub fn active_index(intervals: &[TimingInterval], position: f64) -> Option<usize> {
    intervals.iter().position(|w| w.contains(position))
}

/// The span of text currently being spoken.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub index: usize,
    pub label: String,
    /// Byte range into the spoken text; `None` when a word could not be found in it.
    pub range: Option<Range<usize>>,
    /// The same span counted in characters, for consumers that index by char.
    pub char_range: Option<Range<usize>>,
}

/// Converts a byte range of `text` into a character range.
fn char_span(text: &str, range: &Range<usize>) -> Range<usize> {
    let start = text[..range.start].chars().count();
    start..start + text[range.clone()].chars().count()
}

/// Receives highlight changes. `None` means nothing is active.
pub trait HighlightSink: Send + Sync {
    fn highlight(&self, highlight: Option<&Highlight>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Words,
    Sentences,
}

/// Intervals paired with the text ranges they highlight.
#[derive(Debug, Clone)]
pub struct HighlightTrack {
    kind: TrackKind,
    intervals: Arc<[TimingInterval]>,
    spans: Vec<Option<Range<usize>>>,
    char_spans: Vec<Option<Range<usize>>>,
}

impl HighlightTrack {
    /// Word timings from the provider, each located in `text` by searching
    /// forward from the previous word.
    pub fn words(text: &str, timings: Arc<[WordTiming]>) -> Self {
        let mut cursor = 0;
        let spans: Vec<Option<Range<usize>>> = timings
            .iter()
            .map(|word| {
                let label = word.label.trim();
                if label.is_empty() {
                    return None;
                }
                let found = text[cursor..]
                    .find(label)
                    .map(|p| p + cursor)
                    .or_else(|| text.find(label));
                found.map(|start| {
                    let range = start..start + label.len();
                    cursor = range.end;
                    range
                })
            })
            .collect();

        Self {
            kind: TrackKind::Words,
            intervals: timings,
            char_spans: char_spans(text, &spans),
            spans,
        }
    }

    /// Estimated sentence timings; ranges come from the segment positions.
    pub fn sentences(text: &str, duration: f64) -> Self {
        let intervals = estimate_sentence_timings(text, duration);
        let spans: Vec<Option<Range<usize>>> = if intervals.is_empty() {
            Vec::new()
        } else {
            split_segments(text)
                .into_iter()
                .map(|segment| Some(segment.range))
                .collect()
        };

        Self {
            kind: TrackKind::Sentences,
            intervals: intervals.into(),
            char_spans: char_spans(text, &spans),
            spans,
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn intervals(&self) -> &[TimingInterval] {
        &self.intervals
    }

    pub fn resolve(&self, position: f64) -> Option<Highlight> {
        let index = active_index(&self.intervals, position)?;
        Some(Highlight {
            index,
            label: self.intervals[index].label.clone(),
            range: self.spans.get(index).cloned().flatten(),
            char_range: self.char_spans.get(index).cloned().flatten(),
        })
    }
}

fn char_spans(text: &str, spans: &[Option<Range<usize>>]) -> Vec<Option<Range<usize>>> {
    spans
        .iter()
        .map(|span| span.as_ref().map(|range| char_span(text, range)))
        .collect()
}

/// Spawns highlight loops paced at the display refresh interval.
#[derive(Debug, Clone)]
pub struct PlaybackSynchronizer {
    frame_interval: Duration,
}

impl PlaybackSynchronizer {
    pub fn new(frame_interval: Duration) -> Self {
        Self { frame_interval }
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Starts a loop that reports highlight changes until playback pauses,
    /// ends, or the returned handle is detached or dropped.
    pub fn attach(
        &self,
        playback: Arc<dyn Playback>,
        track: Arc<HighlightTrack>,
        sink: Arc<dyn HighlightSink>,
    ) -> SyncHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_highlight_loop(
            playback,
            track,
            sink,
            self.frame_interval,
            cancel.clone(),
        ));
        SyncHandle {
            cancel,
            task: Some(task),
        }
    }
}

async fn run_highlight_loop(
    playback: Arc<dyn Playback>,
    track: Arc<HighlightTrack>,
    sink: Arc<dyn HighlightSink>,
    frame_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut current: Option<usize> = None;
    let mut reported = false;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if playback.is_ended() {
            if current.is_some() {
                sink.highlight(None);
            }
            break;
        }
        if playback.is_paused() {
            break;
        }

        let highlight = track.resolve(playback.position());
        let index = highlight.as_ref().map(|h| h.index);
        if !reported || index != current {
            sink.highlight(highlight.as_ref());
            current = index;
            reported = true;
        }
    }

    tracing::trace!(kind = ?track.kind(), "Highlight loop stopped");
}

/// Owner of a running highlight loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct SyncHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    pub fn detach(self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the loop to exit on its own.
    pub async fn finished(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
