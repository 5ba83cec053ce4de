//! Request and response fixtures.

use readalong::SynthesisRequest;

pub const BOUNDARY: &str = "frontier-7f3a";

pub fn request(text: &str) -> SynthesisRequest {
    SynthesisRequest::new(text, "azure", "en-US", "en-US-JennyNeural")
}

pub fn multipart_content_type() -> String {
    format!("multipart/mixed; boundary={}", BOUNDARY)
}

/// Two word events in provider ticks: "Hello" for [0, 0.5), "world" for [0.5, 1.0).
pub fn word_events() -> &'static str {
    r#"[
        {"type": "Word", "text": "Hello", "offset": 0, "duration": 5000000},
        {"type": "Sentence", "text": "Hello world.", "offset": 0, "duration": 10000000},
        {"type": "Word", "text": "world", "offset": 5000000, "duration": 5000000}
    ]"#
}

/// A closed `multipart/mixed` body with an optional JSON part and an optional audio part.
pub fn multipart_body(json: Option<&str>, audio: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(json) = json {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Type: application/json\r\n\r\n");
        body.extend_from_slice(json.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some(audio) = audio {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Type: audio/mpeg\r\n\r\n");
        body.extend_from_slice(audio);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Bytes that are not valid UTF-8 and contain CR/LF and dashes.
pub fn binary_audio() -> Vec<u8> {
    vec![0xFF, 0xFB, 0x90, 0x00, b'\r', b'\n', b'-', b'-', 0xC3, 0x28, 0x80, 0x7F]
}
