use crate::error::ReadalongError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single text-to-speech request as sent to `POST /api/tts`.
///
/// Field order matters: it is the serialization order of both the request body
/// and the fingerprint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub provider: String,
    pub language: String,
    pub voice: String,
}

impl SynthesisRequest {
    pub fn new(
        text: impl Into<String>,
        provider: impl Into<String>,
        language: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            language: language.into(),
            voice: voice.into(),
        }
    }

    /// Trims the text and rejects requests with nothing left to speak.
    pub fn normalized(mut self) -> Result<Self, ReadalongError> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(ReadalongError::EmptyInput);
        }
        if trimmed.len() != self.text.len() {
            self.text = trimmed.to_string();
        }
        Ok(self)
    }

    pub fn fingerprint(&self) -> RequestFingerprint {
        RequestFingerprint::of(self)
    }
}

/// Cache key for a request: the JSON encoding of its fields in declaration order.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    pub fn of(request: &SynthesisRequest) -> Self {
        // Four string fields always serialize
        let key = serde_json::to_string(request).unwrap_or_else(|_| {
            format!(
                "{}\u{1f}{}\u{1f}{}\u{1f}{}",
                request.text, request.provider, request.language, request.voice
            )
        });
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str) -> SynthesisRequest {
        SynthesisRequest::new(text, "azure", "en-US", "en-US-JennyNeural")
    }

    #[test]
    fn test_identical_requests_share_fingerprint() {
        assert_eq!(request("Hello").fingerprint(), request("Hello").fingerprint());
    }

    #[test]
    fn test_fields_are_serialized_in_fixed_order() {
        assert_eq!(
            request("Hi").fingerprint().as_str(),
            r#"{"text":"Hi","provider":"azure","language":"en-US","voice":"en-US-JennyNeural"}"#
        );
    }

    #[test]
    fn test_any_field_changes_fingerprint() {
        let base = request("Hello").fingerprint();
        assert_ne!(base, request("Hello!").fingerprint());

        let mut other_voice = request("Hello");
        other_voice.voice = "en-US-GuyNeural".into();
        assert_ne!(base, other_voice.fingerprint());

        // Shifting text between fields must not collide
        let a = SynthesisRequest::new("ab", "c", "d", "e");
        let b = SynthesisRequest::new("a", "bc", "d", "e");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_normalized_trims_and_rejects_empty() {
        let req = request("  Hello world \n").normalized().unwrap();
        assert_eq!(req.text, "Hello world");
        assert_eq!(req.fingerprint(), request("Hello world").fingerprint());

        assert!(matches!(
            request("   \t").normalized(),
            Err(ReadalongError::EmptyInput)
        ));
    }
}
