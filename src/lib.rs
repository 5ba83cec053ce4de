//! Text-to-speech playback with a highlight cursor that follows the audio.

pub mod backends;
pub mod cache;
pub mod config_loader;
pub mod controller;
pub mod error;
pub mod fingerprint;
pub mod parser;
pub mod player;
pub mod synchronizer;
pub mod timing;

pub use controller::{PlaybackController, PlaybackState, SpeakOutcome};
pub use error::ReadalongError;
pub use fingerprint::SynthesisRequest;
