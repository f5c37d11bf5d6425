//! Shared data model for the speech pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduling priority of a speech request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    /// Preempts current playback and discards everything queued
    Urgent,
}

/// A pending speech request. Immutable once enqueued.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeechItem {
    pub text: String,
    pub sign_type: Option<String>,
    pub priority: Priority,
    pub submitted_at: DateTime<Utc>,
}

impl SpeechItem {
    pub fn new(text: impl Into<String>, sign_type: Option<&str>, priority: Priority) -> Self {
        Self {
            text: text.into(),
            sign_type: sign_type.map(str::to_string),
            priority,
            submitted_at: Utc::now(),
        }
    }

    pub fn normal(text: impl Into<String>) -> Self {
        Self::new(text, None, Priority::Normal)
    }

    pub fn urgent(text: impl Into<String>) -> Self {
        Self::new(text, None, Priority::Urgent)
    }
}

/// Read-only snapshot of one entry in the engine's voice catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    /// Engine-specific identifier used to address the voice
    pub id: String,
    pub name: String,
    /// BCP-47 style tag, e.g. `en-US`
    pub language: String,
    pub is_local: bool,
    pub is_default: bool,
}

impl VoiceDescriptor {
    pub fn is_english(&self) -> bool {
        self.language.to_ascii_lowercase().starts_with("en")
    }
}

const MIN_RATE: f32 = 0.1;
const MAX_RATE: f32 = 4.0;

/// Process-wide default acoustic parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Multiplier of the engine's natural speaking speed
    pub rate: f32,
    /// 0.0 - 2.0, 1.0 is the voice's natural pitch
    pub pitch: f32,
    /// 0.0 - 1.0
    pub volume: f32,
    /// Silence inserted after each completed utterance
    pub pause_between_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 0.9,
            pause_between_ms: 300,
        }
    }
}

impl Settings {
    /// Shallow merge: only fields present in `update` are replaced.
    /// Values are clamped to their ranges; non-finite values are ignored.
    pub fn merge(&mut self, update: SettingsUpdate) {
        if let Some(v) = update.rate.filter(|v| v.is_finite()) {
            self.rate = v.clamp(MIN_RATE, MAX_RATE);
        }
        if let Some(v) = update.pitch.filter(|v| v.is_finite()) {
            self.pitch = v.clamp(0.0, 2.0);
        }
        if let Some(v) = update.volume.filter(|v| v.is_finite()) {
            self.volume = v.clamp(0.0, 1.0);
        }
        if let Some(v) = update.pause_between_ms {
            self.pause_between_ms = v;
        }
    }
}

/// Partial settings, as accepted by `update_settings`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub rate: Option<f32>,
    #[serde(default)]
    pub pitch: Option<f32>,
    #[serde(default)]
    pub volume: Option<f32>,
    #[serde(default)]
    pub pause_between_ms: Option<u64>,
}

/// A materialized utterance handed to the synthesis engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaybackRequest {
    pub text: String,
    pub voice: Option<VoiceDescriptor>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Identity of one submission to the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utt-{}", self.0)
    }
}

/// Lifecycle callbacks reported by the engine for a submitted request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started { id: UtteranceId },
    Completed { id: UtteranceId },
    Failed { id: UtteranceId, reason: String },
}

impl PlaybackEvent {
    pub fn id(&self) -> UtteranceId {
        match self {
            PlaybackEvent::Started { id }
            | PlaybackEvent::Completed { id }
            | PlaybackEvent::Failed { id, .. } => *id,
        }
    }
}

/// Read-only snapshot of the coordinator
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorStatus {
    pub initialized: bool,
    pub is_speaking: bool,
    pub queue_length: usize,
    pub current_voice_name: Option<String>,
    pub settings: Settings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_replaces_present_fields_only() {
        let mut settings = Settings::default();
        settings.merge(SettingsUpdate {
            volume: Some(0.4),
            ..Default::default()
        });
        assert_eq!(settings.volume, 0.4);
        assert_eq!(settings.rate, 0.9);
        assert_eq!(settings.pause_between_ms, 300);
    }

    #[test]
    fn test_merge_clamps_out_of_range() {
        let mut settings = Settings::default();
        settings.merge(SettingsUpdate {
            rate: Some(-1.0),
            pitch: Some(3.5),
            volume: Some(-0.2),
            pause_between_ms: None,
        });
        assert_eq!(settings.rate, MIN_RATE);
        assert_eq!(settings.pitch, 2.0);
        assert_eq!(settings.volume, 0.0);

        settings.merge(SettingsUpdate {
            rate: Some(100.0),
            volume: Some(7.0),
            ..Default::default()
        });
        assert_eq!(settings.rate, MAX_RATE);
        assert_eq!(settings.volume, 1.0);
    }

    #[test]
    fn test_merge_ignores_nan() {
        let mut settings = Settings::default();
        settings.merge(SettingsUpdate {
            rate: Some(f32::NAN),
            pitch: Some(f32::INFINITY),
            volume: Some(f32::NAN),
            pause_between_ms: None,
        });
        assert_eq!(settings, Settings::default());
    }
}
