//! Newline-delimited JSON protocol between a gesture recognizer and the speech service.
//!
//! Each input line is one command tagged by `op`; each command produces one
//! response line, `{"ok": true, ...}` or `{"ok": false, "error": "..."}`.

use serde::Deserialize;
use serde_json::{json, Value};
use signvox_core::{Priority, SettingsUpdate, SpeechHandle};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RelayCommand {
    Speak {
        text: String,
        #[serde(default, alias = "signType")]
        sign_type: Option<String>,
        #[serde(default)]
        priority: Priority,
    },
    Stop,
    Pause,
    Resume,
    Status,
    Voices,
    SetVoice {
        name: String,
    },
    Settings(SettingsUpdate),
    Contexts,
    Render {
        text: String,
        #[serde(default, alias = "signType")]
        sign_type: Option<String>,
        path: PathBuf,
    },
}

/// Parse and execute one input line
pub async fn handle_line(handle: &SpeechHandle, line: &str) -> Value {
    match serde_json::from_str::<RelayCommand>(line) {
        Ok(cmd) => dispatch(handle, cmd).await,
        Err(e) => failure(format!("invalid command: {e}")),
    }
}

pub async fn dispatch(handle: &SpeechHandle, cmd: RelayCommand) -> Value {
    debug!(target: "sign_speaker", command = ?cmd, "Relay command");
    let result = match cmd {
        RelayCommand::Speak {
            text,
            sign_type,
            priority,
        } => {
            if text.is_empty() {
                return failure("text is required");
            }
            let enhanced = handle.preview(&text, sign_type.as_deref());
            info!(target: "sign_speaker", %text, sign_type = ?sign_type, ?priority, "Speaking sign");
            handle
                .speak(text, sign_type.as_deref(), priority)
                .map(|_| json!({ "enhanced_text": enhanced }))
        }
        RelayCommand::Stop => handle.stop().await.map(|_| json!({})),
        RelayCommand::Pause => handle.pause().map(|_| json!({})),
        RelayCommand::Resume => handle.resume().map(|_| json!({})),
        RelayCommand::Status => Ok(json!({ "status": handle.status() })),
        RelayCommand::Voices => handle
            .voices()
            .await
            .map(|voices| json!({ "voices": voices })),
        RelayCommand::SetVoice { name } => match handle.set_voice(name.as_str()).await {
            Ok(true) => Ok(json!({ "voice": name })),
            Ok(false) => return failure(format!("unknown voice: {name}")),
            Err(e) => Err(e),
        },
        RelayCommand::Settings(update) => handle.update_settings(update).map(|_| json!({})),
        RelayCommand::Contexts => Ok(json!({ "contexts": handle.contexts() })),
        RelayCommand::Render {
            text,
            sign_type,
            path,
        } => {
            if text.is_empty() {
                return failure("text is required");
            }
            match handle.render(&text, sign_type.as_deref()).await {
                Ok(wav) => match tokio::fs::write(&path, &wav).await {
                    Ok(()) => Ok(json!({ "path": path, "bytes": wav.len() })),
                    Err(e) => Err(e.into()),
                },
                Err(e) => Err(e),
            }
        }
    };

    match result {
        Ok(mut body) => {
            body["ok"] = Value::Bool(true);
            body
        }
        Err(e) => failure(e.to_string()),
    }
}

fn failure(msg: impl Into<String>) -> Value {
    json!({ "ok": false, "error": msg.into() })
}
