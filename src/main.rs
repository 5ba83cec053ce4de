//! readalong - speak text and follow along as it is read
//!
//! Sends text to the synthesis service, plays the audio and prints each word
//! (or estimated sentence) as it is spoken.

use clap::{Parser, Subcommand};
use readalong::backends::http::HttpBackend;
use readalong::backends::SynthesisBackend;
use readalong::config_loader::Settings;
use readalong::player::RodioPlayer;
use readalong::synchronizer::{Highlight, HighlightSink};
use readalong::{
    PlaybackController, PlaybackState, ReadalongError, SpeakOutcome, SynthesisRequest,
};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Text-to-speech with a live highlight cursor
#[derive(Parser)]
#[command(name = "readalong")]
#[command(author = "StarTuz")]
#[command(version)]
#[command(about = "Speak text aloud and highlight it as it is read", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List providers and their voices, grouped by locale
    Voices {
        /// Only show this provider
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Synthesize text and play it with highlighting
    Speak {
        /// Text to speak
        text: String,
        /// Synthesis provider (azure, elevenlabs, gtts, ...)
        #[arg(short, long)]
        provider: Option<String>,
        /// Language code, e.g. en-US
        #[arg(short, long)]
        language: Option<String>,
        /// Voice short name
        #[arg(short, long)]
        voice: Option<String>,
        /// Playback rate (0.0-4.0]
        #[arg(short, long)]
        rate: Option<f32>,
        /// Save the last played audio to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Keep reading lines from stdin: empty line pauses/resumes, :q quits
        #[arg(short, long)]
        interactive: bool,
    },
}

/// Prints highlight changes to stdout.
struct TerminalHighlighter;

impl HighlightSink for TerminalHighlighter {
    fn highlight(&self, highlight: Option<&Highlight>) {
        if let Some(h) = highlight {
            println!("  ▸ {}", h.label);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(err: &ReadalongError) {
    tracing::debug!(error = %err, "Operation failed");
    eprintln!("{}", err.user_notice());
}

async fn list_voices(settings: &Settings, provider: Option<String>) -> Result<(), Box<dyn Error>> {
    let backend = HttpBackend::from_settings(settings)?;
    let catalog = match backend.list_voices().await {
        Ok(catalog) => catalog,
        Err(err) => {
            report(&err);
            std::process::exit(1);
        }
    };

    let providers: Vec<&str> = match provider.as_deref() {
        Some(name) => vec![name],
        None => catalog.provider_names(),
    };
    for name in providers {
        let marker = if name == catalog.default { " (default)" } else { "" };
        println!("{}{}", name, marker);
        for (locale, voices) in catalog.voices_by_locale(name, &settings.voice_locales) {
            println!("  {}", locale);
            for voice in voices {
                println!("    {:<32} {}", voice.short_name, voice.label());
            }
        }
    }
    Ok(())
}

fn spawn_speak(
    controller: &Arc<PlaybackController>,
    request: SynthesisRequest,
    rate: f32,
) -> tokio::task::JoinHandle<()> {
    let controller = controller.clone();
    tokio::spawn(async move {
        match controller.speak(request, rate).await {
            Ok(SpeakOutcome::Playing { cached }) => {
                tracing::debug!(cached, "Speaking");
            }
            Ok(SpeakOutcome::Superseded) => {}
            Err(err) => report(&err),
        }
    })
}

async fn interactive(
    controller: &Arc<PlaybackController>,
    template: &SynthesisRequest,
    rate: f32,
) -> Result<(), Box<dyn Error>> {
    spawn_speak(controller, template.clone(), rate);
    println!("Enter new text to speak, an empty line to pause/resume, :q to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            ":q" => break,
            "" => match controller.toggle_pause() {
                PlaybackState::Paused => println!("[paused]"),
                PlaybackState::Playing => println!("[playing]"),
                _ => {}
            },
            text => {
                let request = SynthesisRequest {
                    text: text.to_string(),
                    ..template.clone()
                };
                spawn_speak(controller, request, rate);
            }
        }
    }

    controller.stop();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();

    let settings = Settings::load()?;

    match cli.command {
        Commands::Voices { provider } => list_voices(&settings, provider).await?,
        Commands::Speak {
            text,
            provider,
            language,
            voice,
            rate,
            output,
            interactive: is_interactive,
        } => {
            let rate = rate.unwrap_or(settings.playback_rate);
            if !(rate > 0.0 && rate <= 4.0) {
                return Err(format!("Playback rate must be in (0, 4], got {}", rate).into());
            }

            let request = SynthesisRequest::new(
                text,
                provider.unwrap_or_else(|| settings.default_provider.clone()),
                language.unwrap_or_else(|| settings.default_language.clone()),
                voice.unwrap_or_else(|| settings.default_voice.clone()),
            );

            let backend = Arc::new(HttpBackend::from_settings(&settings)?);
            let player = match RodioPlayer::new() {
                Ok(player) => Arc::new(player),
                Err(err) => {
                    report(&err);
                    std::process::exit(1);
                }
            };
            let controller = Arc::new(PlaybackController::new(
                backend,
                player,
                Arc::new(TerminalHighlighter),
                settings.frame_interval(),
            ));

            if is_interactive {
                interactive(&controller, &request, rate).await?;
            } else {
                match controller.speak(request, rate).await {
                    Ok(_) => controller.wait_until_finished().await,
                    Err(err) => {
                        report(&err);
                        std::process::exit(1);
                    }
                }
            }

            if let Some(path) = output {
                match controller.last_audio() {
                    Some(audio) => {
                        audio.save(&path)?;
                        println!("Saved {} bytes to {}", audio.len(), path.display());
                    }
                    None => eprintln!("No audio to save"),
                }
            }
        }
    }

    Ok(())
}
