//! Synthesis backend doubles.

use readalong::backends::{RawResponse, SynthesisBackend, VoiceCatalog};
use readalong::{ReadalongError, SynthesisRequest};
use std::sync::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

mockall::mock! {
    pub Backend {}
    #[async_trait::async_trait]
    impl SynthesisBackend for Backend {
        async fn list_voices(&self) -> Result<VoiceCatalog, ReadalongError>;
        async fn synthesize(
            &self,
            request: &SynthesisRequest,
            cancel: CancellationToken,
        ) -> Result<RawResponse, ReadalongError>;
    }
}

pub fn audio_response(bytes: &[u8]) -> RawResponse {
    RawResponse {
        content_type: "audio/mpeg".to_string(),
        body: bytes.to_vec(),
    }
}

/// Answers immediately, except for one text whose answer is held back until
/// [`GatedBackend::release`] is called.
pub struct GatedBackend {
    slow_text: String,
    honour_cancel: bool,
    fail_slow: bool,
    gate: Semaphore,
    calls: Mutex<Vec<String>>,
}

impl GatedBackend {
    pub fn new(slow_text: &str, honour_cancel: bool) -> Self {
        Self {
            slow_text: slow_text.to_string(),
            honour_cancel,
            fail_slow: false,
            gate: Semaphore::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Like [`GatedBackend::new`], but the held-back call fails once released.
    pub fn failing(slow_text: &str) -> Self {
        Self {
            fail_slow: true,
            ..Self::new(slow_text, false)
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Audio returned for `text`, so tests can tell sessions apart.
    pub fn audio_for(text: &str) -> Vec<u8> {
        format!("audio:{}", text).into_bytes()
    }
}

#[async_trait::async_trait]
impl SynthesisBackend for GatedBackend {
    async fn list_voices(&self) -> Result<VoiceCatalog, ReadalongError> {
        Err(ReadalongError::VoicesUnavailable("offline".to_string()))
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
        cancel: CancellationToken,
    ) -> Result<RawResponse, ReadalongError> {
        self.calls.lock().unwrap().push(request.text.clone());

        if request.text == self.slow_text {
            if self.honour_cancel {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ReadalongError::Cancelled),
                    permit = self.gate.acquire() => drop(permit),
                }
            } else {
                let _permit = self.gate.acquire().await;
            }
            if self.fail_slow {
                return Err(ReadalongError::Transport("connection reset".to_string()));
            }
        }

        Ok(audio_response(&Self::audio_for(&request.text)))
    }
}
