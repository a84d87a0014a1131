//! Terminal demo for a live voice session.
//!
//! Connects the default microphone and speaker to the realtime service and
//! prints text, transcript and tool-call activity until interrupted.
//! Requires `OPENAI_API_KEY` in the environment or a `.env` file.

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use voicelink::{SessionEvent, SessionOptions, VoiceSession};

/// voicelink - talk to a realtime speech service from the terminal
#[derive(Parser, Debug)]
#[command(name = "voicelink")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Voice identity for audio output
    #[arg(long)]
    voice: Option<String>,

    /// System instructions for the assistant
    #[arg(long)]
    instructions: Option<String>,

    /// Model identifier
    #[arg(long)]
    model: Option<String>,

    /// Transcription model for user speech (e.g. whisper-1)
    #[arg(long)]
    transcription_model: Option<String>,

    /// Print the full transcript on exit
    #[arg(long)]
    transcript: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut options = SessionOptions::from_env().context("failed to load session options")?;
    if let Some(voice) = cli.voice {
        options.voice = Some(voice);
    }
    if let Some(instructions) = cli.instructions {
        options.instructions = Some(instructions);
    }
    if let Some(model) = cli.model {
        options.model = model;
    }
    if let Some(model) = cli.transcription_model {
        options.transcription_model = Some(model);
    }

    let (mut session, mut events) = VoiceSession::new(options);
    session.connect().await.context("failed to connect")?;
    info!("session open, speak into the microphone (ctrl-c to quit)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                info!("interrupted, shutting down");
                break;
            }
            event = events.recv() => match event {
                Some(SessionEvent::Text(fragment)) => {
                    print!("{fragment}");
                    std::io::stdout().flush().ok();
                }
                Some(SessionEvent::Transcript(entry)) => {
                    println!("[{}] {}", entry.role, entry.text);
                }
                Some(SessionEvent::ToolCall(call)) => {
                    println!(
                        "tool requested: {} {}",
                        call.name,
                        serde_json::to_string(&call.arguments).unwrap_or_default()
                    );
                }
                Some(SessionEvent::Connection(true)) => {}
                Some(SessionEvent::Connection(false)) => {
                    info!("channel closed by the service");
                    break;
                }
                None => break,
            }
        }
    }

    if cli.transcript {
        for entry in session.transcript() {
            println!("{} [{}] {}", entry.timestamp.to_rfc3339(), entry.role, entry.text);
        }
    }

    session.disconnect().await.context("failed to disconnect")?;
    Ok(())
}
