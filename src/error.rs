//! Error types shared by the backend, parser, player and controller.

/// Notice shown when the voice catalog cannot be fetched.
pub const VOICES_UNAVAILABLE_NOTICE: &str = "voice list unavailable";

/// Notice shown for every failure along the synthesize-and-play path.
pub const AUDIO_FAILED_NOTICE: &str = "audio processing failed";

#[derive(Debug, thiserror::Error)]
pub enum ReadalongError {
    /// The HTTP request did not complete or returned a non-success status.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The response body could not be split into audio and timing data.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The request text was empty after trimming.
    #[error("Nothing to speak: input text is empty")]
    EmptyInput,

    /// The voice catalog could not be fetched or decoded.
    #[error("Voice list unavailable: {0}")]
    VoicesUnavailable(String),

    /// Audio could not be decoded or sent to the output device.
    #[error("Playback failed: {0}")]
    Playback(String),

    /// A newer request superseded this one before the backend answered.
    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ReadalongError {
    /// Maps the error onto one of the two categories users ever see.
    pub fn user_notice(&self) -> &'static str {
        match self {
            ReadalongError::VoicesUnavailable(_) => VOICES_UNAVAILABLE_NOTICE,
            _ => AUDIO_FAILED_NOTICE,
        }
    }
}

impl From<reqwest::Error> for ReadalongError {
    fn from(err: reqwest::Error) -> Self {
        ReadalongError::Transport(err.to_string())
    }
}
