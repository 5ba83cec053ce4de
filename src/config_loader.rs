use crate::error::ReadalongError;
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_url: String,
    // Request defaults used when the CLI flags are omitted
    pub default_provider: String,
    pub default_language: String,
    pub default_voice: String,
    pub playback_rate: f32,
    pub request_timeout_secs: u64,
    // Highlight cadence, one evaluation per display frame
    pub refresh_rate_hz: u32,
    // Locales offered when listing a provider's voices
    pub voice_locales: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "https://voice-of-hope.onrender.com".to_string(),
            default_provider: "azure".to_string(),
            default_language: "en-US".to_string(),
            default_voice: "en-US-JennyNeural".to_string(),
            playback_rate: 1.0,
            request_timeout_secs: 30,
            refresh_rate_hz: 60,
            voice_locales: vec!["en-US".to_string(), "vi-VN".to_string()],
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = Settings::default();
        let builder = Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("default_provider", defaults.default_provider)?
            .set_default("default_language", defaults.default_language)?
            .set_default("default_voice", defaults.default_voice)?
            .set_default("playback_rate", defaults.playback_rate as f64)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs)?
            .set_default("refresh_rate_hz", defaults.refresh_rate_hz)?
            .set_default("voice_locales", defaults.voice_locales)?
            // Local config file (if exists)
            .add_source(File::with_name("Readalong").required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/readalong/Readalong",
                    dirs::config_dir()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| ".".to_string())
                ))
                .required(false),
            )
            // Environment variables (e.g. READALONG_API_URL)
            .add_source(
                config::Environment::with_prefix("READALONG")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("voice_locales"),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads and validates settings, surfacing failures as [`ReadalongError::Config`].
    pub fn load() -> Result<Self, ReadalongError> {
        Ok(Self::new()?)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "api_url must not be empty".to_string(),
            ));
        }
        if !(self.playback_rate > 0.0 && self.playback_rate <= 4.0) {
            return Err(config::ConfigError::Message(format!(
                "Invalid playback_rate: {}. Must be in (0.0, 4.0]",
                self.playback_rate
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.refresh_rate_hz == 0 || self.refresh_rate_hz > 240 {
            return Err(config::ConfigError::Message(format!(
                "Invalid refresh_rate_hz: {}. Must be between 1 and 240",
                self.refresh_rate_hz
            )));
        }
        Ok(())
    }

    /// Time between two highlight evaluations.
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.refresh_rate_hz as f64)
    }
}
