use super::{RawResponse, SynthesisBackend, VoiceCatalog};
use crate::config_loader::Settings;
use crate::error::ReadalongError;
use crate::fingerprint::SynthesisRequest;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Content type assumed when the server does not send one.
const FALLBACK_CONTENT_TYPE: &str = "audio/mpeg";

/// Client for the `/api/voices` and `/api/tts` endpoints.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ReadalongError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ReadalongError> {
        Self::new(
            &settings.api_url,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post_tts(&self, request: &SynthesisRequest) -> Result<RawResponse, ReadalongError> {
        let resp = self
            .client
            .post(self.url("api/tts"))
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let body = resp.bytes().await?.to_vec();

        tracing::debug!(%content_type, bytes = body.len(), "Received synthesis response");
        Ok(RawResponse { content_type, body })
    }
}

#[async_trait::async_trait]
impl SynthesisBackend for HttpBackend {
    async fn list_voices(&self) -> Result<VoiceCatalog, ReadalongError> {
        let resp = self
            .client
            .get(self.url("api/voices"))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ReadalongError::VoicesUnavailable(e.to_string()))?;

        resp.json::<VoiceCatalog>()
            .await
            .map_err(|e| {
                ReadalongError::VoicesUnavailable(format!("Failed to parse voices: {}", e))
            })
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancel: CancellationToken,
    ) -> Result<RawResponse, ReadalongError> {
        tracing::info!(
            provider = %request.provider,
            voice = %request.voice,
            chars = request.text.chars().count(),
            "Requesting synthesis"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!("Synthesis request cancelled");
                Err(ReadalongError::Cancelled)
            }
            result = self.post_tts(request) => result,
        }
    }
}
