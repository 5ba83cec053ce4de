pub mod http;

use crate::error::ReadalongError;
use crate::fingerprint::SynthesisRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Represents a text-to-speech voice offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    #[serde(rename = "Locale")]
    pub locale: String,
    #[serde(rename = "ShortName")]
    pub short_name: String,
    #[serde(rename = "DisplayName", default)]
    pub display_name: Option<String>,
}

impl Voice {
    /// Human readable name, falling back to the short name.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.short_name)
    }
}

/// Response of `GET /api/voices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceCatalog {
    pub default: String,
    pub providers: BTreeMap<String, Vec<Voice>>,
}

impl VoiceCatalog {
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Voices of `provider` restricted to `locales`, grouped by locale.
    /// An empty `locales` list keeps every locale.
    pub fn voices_by_locale(
        &self,
        provider: &str,
        locales: &[String],
    ) -> BTreeMap<&str, Vec<&Voice>> {
        let mut grouped: BTreeMap<&str, Vec<&Voice>> = BTreeMap::new();
        for voice in self.providers.get(provider).into_iter().flatten() {
            if locales.is_empty() || locales.iter().any(|l| l == &voice.locale) {
                grouped.entry(voice.locale.as_str()).or_default().push(voice);
            }
        }
        grouped
    }
}

/// Raw `/api/tts` answer before payload decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Remote service that turns text into audio.
///
/// The cancellation token is cancelled when a newer request supersedes this
/// one; implementations may stop early and return [`ReadalongError::Cancelled`].
#[async_trait::async_trait]
pub trait SynthesisBackend: Send + Sync {
    async fn list_voices(&self) -> Result<VoiceCatalog, ReadalongError>;

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancel: CancellationToken,
    ) -> Result<RawResponse, ReadalongError>;
}
