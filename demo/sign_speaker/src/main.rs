mod config;
mod relay;

use config::SignSpeakerConfig;
use signvox_audio::CliSpeechEngine;
use signvox_core::{playback_channel, SpeechService};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging goes to stderr; stdout carries protocol responses
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,signvox_core=info,sign_speaker=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(target: "sign_speaker", "Starting sign speaker: stdin JSON → speech queue → TTS");

    // Load configuration (defaults + env + optional TOML overlay)
    let cfg = SignSpeakerConfig::load();

    let (events_tx, events_rx) = playback_channel();
    let engine = Arc::new(CliSpeechEngine::new(cfg.engine.clone(), events_tx));
    let service = SpeechService::new(engine, events_rx, cfg.speech.clone());
    let (handle, service_task) = service.start();

    if let Err(e) = handle.initialize().await {
        warn!(target: "sign_speaker", error = %e, "Speech initialization failed; continuing with engine default voice");
    }
    let status = handle.status();
    info!(
        target: "sign_speaker",
        voice = ?status.current_voice_name,
        contexts = ?handle.contexts(),
        "Ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(l)) => l,
                    Ok(None) => break,
                    Err(e) => {
                        error!(target: "sign_speaker", error = %e, "Failed to read stdin");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = relay::handle_line(&handle, &line).await;
                stdout.write_all(format!("{response}\n").as_bytes()).await?;
                stdout.flush().await?;
            }
            _ = signal::ctrl_c() => {
                info!(target: "sign_speaker", "Ctrl-C received; shutting down");
                break;
            }
        }
    }

    // Dropping the last handle stops playback and ends the service loop
    let _ = handle.stop().await;
    drop(handle);
    let _ = service_task.await;
    info!(target: "sign_speaker", "Sign speaker stopped");
    Ok(())
}
