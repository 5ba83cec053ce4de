//! Decoding of `/api/tts` response bodies.
//!
//! A provider answers either with a bare audio stream or with a
//! `multipart/mixed` body carrying one JSON part (timing events) and one audio
//! part. Part boundaries and headers are located on the raw bytes; the audio is
//! sliced straight out of the original buffer so it never goes through a text
//! decode.

use crate::error::ReadalongError;
use crate::timing::{TimingInterval, WordTiming};
use serde::Deserialize;
use std::ops::Range;

const HEADER_END: &[u8] = b"\r\n\r\n";
const CRLF: &[u8] = b"\r\n";

/// How the response body is structured, from its `Content-Type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Audio,
    Composite { boundary: String },
}

impl ContentKind {
    pub fn from_content_type(content_type: &str) -> Result<Self, ReadalongError> {
        let mut params = content_type.split(';');
        let mime = params.next().unwrap_or_default().trim().to_ascii_lowercase();
        if !mime.starts_with("multipart/") {
            return Ok(ContentKind::Audio);
        }

        let boundary = params
            .filter_map(|param| param.split_once('='))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ReadalongError::MalformedResponse(format!(
                    "multipart content type without boundary: {}",
                    content_type
                ))
            })?;

        Ok(ContentKind::Composite { boundary })
    }
}

/// Result of decoding a response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    /// Plain audio, or a composite message without a metadata part.
    AudioOnly { audio: Vec<u8> },
    /// Audio plus the word timings from the metadata part.
    AudioWithTimings {
        audio: Vec<u8>,
        timings: Vec<WordTiming>,
    },
}

impl ParsedPayload {
    pub fn audio(&self) -> &[u8] {
        match self {
            ParsedPayload::AudioOnly { audio } | ParsedPayload::AudioWithTimings { audio, .. } => {
                audio
            }
        }
    }

    pub fn timings(&self) -> &[WordTiming] {
        match self {
            ParsedPayload::AudioOnly { .. } => &[],
            ParsedPayload::AudioWithTimings { timings, .. } => timings,
        }
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<WordTiming>) {
        match self {
            ParsedPayload::AudioOnly { audio } => (audio, Vec::new()),
            ParsedPayload::AudioWithTimings { audio, timings } => (audio, timings),
        }
    }
}

/// One record of the provider's timing metadata.
#[derive(Debug, Deserialize)]
struct TimingEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    offset: f64,
    #[serde(default)]
    duration: f64,
}

/// Decodes a response body according to its `Content-Type` header.
pub fn parse_response(content_type: &str, body: &[u8]) -> Result<ParsedPayload, ReadalongError> {
    match ContentKind::from_content_type(content_type)? {
        ContentKind::Audio => {
            if body.is_empty() {
                return Err(ReadalongError::MalformedResponse(
                    "empty audio response".to_string(),
                ));
            }
            Ok(ParsedPayload::AudioOnly {
                audio: body.to_vec(),
            })
        }
        ContentKind::Composite { boundary } => parse_composite(body, &boundary),
    }
}

#[derive(Debug)]
struct Part {
    /// Offset of the `--boundary` marker that opens this part.
    marker_at: usize,
    /// Lowercased header block, only ever inspected.
    headers: String,
    /// Bytes after the blank line, up to the next marker.
    body: Range<usize>,
}

/// Splits a composite body into timing metadata and audio.
pub fn parse_composite(body: &[u8], boundary: &str) -> Result<ParsedPayload, ReadalongError> {
    let marker = format!("--{}", boundary).into_bytes();
    let (parts, closed_at) = split_parts(body, &marker);
    tracing::debug!(parts = parts.len(), closed = closed_at.is_some(), "Split composite response");

    let timings = match parts.iter().find(|p| p.headers.contains("application/json")) {
        Some(part) => {
            let json = &body[strip_delimiter_crlf(body, part.body.clone())];
            let events: Vec<TimingEvent> = serde_json::from_slice(json).map_err(|e| {
                ReadalongError::MalformedResponse(format!(
                    "timing metadata is not valid JSON: {}",
                    e
                ))
            })?;
            Some(word_timings(events))
        }
        None => None,
    };

    let audio_index = parts
        .iter()
        .position(|p| p.headers.contains("audio/"))
        .ok_or_else(|| {
            ReadalongError::MalformedResponse("composite response has no audio part".to_string())
        })?;

    // The audio runs to the next real part or closing delimiter, else to the end of the buffer
    let audio_start = parts[audio_index].body.start;
    let audio_end = parts
        .get(audio_index + 1)
        .map(|next| next.marker_at)
        .or(closed_at)
        .unwrap_or(body.len());
    let audio_range = strip_delimiter_crlf(body, audio_start..audio_end.max(audio_start));
    if audio_range.is_empty() {
        return Err(ReadalongError::MalformedResponse(
            "audio part is empty".to_string(),
        ));
    }
    let audio = body[audio_range].to_vec();

    Ok(match timings {
        Some(timings) => ParsedPayload::AudioWithTimings { audio, timings },
        None => ParsedPayload::AudioOnly { audio },
    })
}

/// Keeps word events only and converts ticks to seconds.
fn word_timings(events: Vec<TimingEvent>) -> Vec<WordTiming> {
    events
        .into_iter()
        .filter(|e| e.kind.eq_ignore_ascii_case("word"))
        .map(|e| TimingInterval::from_ticks(e.text, e.offset, e.duration))
        .collect()
}

/// Finds every part with a header block. Marker occurrences that do not open a
/// header block (e.g. inside binary data) are skipped.
fn split_parts(body: &[u8], marker: &[u8]) -> (Vec<Part>, Option<usize>) {
    let mut markers = Vec::new();
    let mut pos = 0;
    while let Some(idx) = find(body, marker, pos) {
        markers.push(idx);
        pos = idx + marker.len();
    }

    let mut parts = Vec::new();
    let mut closed_at = None;
    for (i, &marker_at) in markers.iter().enumerate() {
        let start = marker_at + marker.len();
        let end = markers.get(i + 1).copied().unwrap_or(body.len());
        if start >= end {
            continue;
        }

        let fragment = &body[start..end];
        if fragment.starts_with(b"--") {
            closed_at = Some(marker_at);
            break;
        }
        if !fragment.starts_with(CRLF) {
            continue;
        }

        let Some(header_end) = find(body, HEADER_END, start).filter(|&h| h < end) else {
            continue;
        };
        let headers = String::from_utf8_lossy(&body[start..header_end]).to_ascii_lowercase();
        if !headers.contains("content-type") {
            continue;
        }

        parts.push(Part {
            marker_at,
            headers,
            body: header_end + HEADER_END.len()..end,
        });
    }

    (parts, closed_at)
}

/// Drops the CRLF that belongs to the following delimiter.
fn strip_delimiter_crlf(body: &[u8], range: Range<usize>) -> Range<usize> {
    if range.len() >= CRLF.len() && range.end < body.len() && body[..range.end].ends_with(CRLF) {
        range.start..range.end - CRLF.len()
    } else {
        range
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|p| p + from)
}
