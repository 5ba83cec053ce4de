//! Timing intervals and the proportional sentence-estimation model.
//!
//! Word timings come from provider metadata. When a provider returns audio
//! only, the text is cut into sentence-like segments and the audio duration is
//! shared out in proportion to each segment's character count.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Provider offsets are expressed in 100 ns ticks.
pub const TICKS_PER_SECOND: f64 = 10_000_000.0;

lazy_static! {
    /// A run of non-delimiters followed by its delimiters and whitespace.
    static ref SEGMENT: Regex =
        Regex::new(r"[^.!?,;:–—]+[.!?,;:–—\s]*").expect("segment pattern is valid");
}

/// A labelled span of audio time, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingInterval {
    pub label: String,
    pub start: f64,
    pub end: f64,
}

/// Exact per-token timing reported by the provider.
pub type WordTiming = TimingInterval;

/// Estimated timing of a sentence-like segment.
pub type SentenceTiming = TimingInterval;

impl TimingInterval {
    pub fn new(label: impl Into<String>, start: f64, end: f64) -> Self {
        debug_assert!(start <= end, "interval start after end");
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    /// Builds an interval from provider ticks.
    pub fn from_ticks(label: impl Into<String>, offset: f64, duration: f64) -> Self {
        let duration = duration.max(0.0);
        Self::new(
            label,
            offset / TICKS_PER_SECOND,
            (offset + duration) / TICKS_PER_SECOND,
        )
    }

    /// Half-open containment: `start <= position < end`.
    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position < self.end
    }
}

/// A sentence-like slice of the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    /// Byte range of `text` inside the source string.
    pub range: Range<usize>,
}

impl Segment<'_> {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Splits text into segments that keep their trailing delimiters.
///
/// The segments partition the input: concatenated they give back `text`.
/// A leading run of delimiters belongs to the first segment.
pub fn split_segments(text: &str) -> Vec<Segment<'_>> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut ranges: Vec<Range<usize>> = SEGMENT.find_iter(text).map(|m| m.range()).collect();
    if ranges.is_empty() {
        // Nothing but delimiters
        ranges.push(0..text.len());
    }
    ranges[0].start = 0;
    if let Some(last) = ranges.last_mut() {
        last.end = text.len();
    }

    ranges
        .into_iter()
        .map(|range| Segment {
            text: &text[range.clone()],
            range,
        })
        .collect()
}

/// Estimates one interval per segment so that the intervals tile `[0, duration]`.
///
/// Returns nothing for empty text or a duration that is negative or not finite.
pub fn estimate_sentence_timings(text: &str, duration: f64) -> Vec<SentenceTiming> {
    if !duration.is_finite() || duration < 0.0 {
        return Vec::new();
    }

    let segments = split_segments(text);
    let total: usize = segments.iter().map(Segment::char_len).sum();
    if total == 0 {
        return Vec::new();
    }

    let mut acc = 0usize;
    segments
        .iter()
        .map(|segment| {
            let start = acc as f64 / total as f64 * duration;
            acc += segment.char_len();
            let end = acc as f64 / total as f64 * duration;
            TimingInterval::new(segment.text.trim(), start, end)
        })
        .collect()
}
