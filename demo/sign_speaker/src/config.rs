use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use signvox_audio::CliEngineConfig;
use signvox_core::{SpeechConfig, ToneProfile};

/// Configuration for the sign speaker relay
#[derive(Clone, Debug, Default)]
pub struct SignSpeakerConfig {
    pub speech: SpeechConfig,
    pub engine: CliEngineConfig,
}

impl SignSpeakerConfig {
    /// Load configuration from a TOML file (path via SIGN_SPEAKER_CONFIG or ./sign_speaker.toml),
    /// overlaying values onto env-driven defaults.
    pub fn load() -> Self {
        let default = Self::default();
        let path =
            std::env::var("SIGN_SPEAKER_CONFIG").unwrap_or_else(|_| "sign_speaker.toml".into());
        let p = Path::new(&path);
        if !p.exists() {
            tracing::info!(target: "sign_speaker", path = %path, "No TOML config found; using defaults/env");
            return default;
        }
        match fs::read_to_string(p) {
            Ok(s) => match Self::from_toml_str(&s, default.clone()) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(target: "sign_speaker", error = %e, "Failed to parse TOML; using defaults");
                    default
                }
            },
            Err(e) => {
                tracing::warn!(target: "sign_speaker", error = %e, "Failed to read TOML; using defaults");
                default
            }
        }
    }

    pub fn from_toml_str(s: &str, base: Self) -> Result<Self, toml::de::Error> {
        Ok(toml::from_str::<SignSpeakerToml>(s)?.overlay(base))
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SignSpeakerToml {
    pub speech: Option<SpeechToml>,
    pub engine: Option<EngineToml>,
    #[serde(default)]
    pub contexts: HashMap<String, ToneProfile>,
}

impl SignSpeakerToml {
    fn overlay(self, mut base: SignSpeakerConfig) -> SignSpeakerConfig {
        if let Some(s) = self.speech {
            s.apply(&mut base.speech);
        }
        if let Some(e) = self.engine {
            e.apply(&mut base.engine);
        }
        for (tag, profile) in self.contexts {
            base.speech.contexts.insert(tag, profile);
        }
        base
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct SpeechToml {
    pub rate: Option<f32>,
    pub pitch: Option<f32>,
    pub volume: Option<f32>,
    pub pause_between_ms: Option<u64>,
    pub preferred_voices: Option<Vec<String>>,
    pub init_attempts: Option<u32>,
    pub init_backoff_ms: Option<u64>,
    pub init_max_backoff_ms: Option<u64>,
}
impl SpeechToml {
    fn apply(self, s: &mut SpeechConfig) {
        if let Some(v) = self.rate {
            s.settings.rate = v;
        }
        if let Some(v) = self.pitch {
            s.settings.pitch = v.clamp(0.0, 2.0);
        }
        if let Some(v) = self.volume {
            s.settings.volume = v.clamp(0.0, 1.0);
        }
        if let Some(v) = self.pause_between_ms {
            s.settings.pause_between_ms = v;
        }
        if let Some(v) = self.preferred_voices {
            s.preferred_voices = v.into_iter().map(|n| n.to_lowercase()).collect();
        }
        if let Some(v) = self.init_attempts {
            s.init.max_attempts = v.max(1);
        }
        if let Some(v) = self.init_backoff_ms {
            s.init.initial_backoff_ms = v;
        }
        if let Some(v) = self.init_max_backoff_ms {
            s.init.max_backoff_ms = v;
        }
    }
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
struct EngineToml {
    pub piper_bin: Option<PathBuf>,
    pub piper_voice: Option<PathBuf>,
    pub piper_voice_dir: Option<PathBuf>,
    pub espeak_bin: Option<PathBuf>,
    pub player: Option<String>,
    pub temp_dir: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub sample_rate: Option<u32>,
}
impl EngineToml {
    fn apply(self, e: &mut CliEngineConfig) {
        if let Some(v) = self.piper_bin {
            e.piper_bin = Some(v);
        }
        if let Some(v) = self.piper_voice {
            e.piper_voice = Some(v);
        }
        if let Some(v) = self.piper_voice_dir {
            e.piper_voice_dir = Some(v);
        }
        if let Some(v) = self.espeak_bin {
            e.espeak_bin = Some(v);
        }
        if let Some(v) = self.player {
            e.player = Some(v);
        }
        if let Some(v) = self.temp_dir {
            e.temp_dir = v;
        }
        if let Some(v) = self.timeout_ms {
            e.timeout_ms = v;
        }
        if let Some(v) = self.sample_rate {
            e.sample_rate = v;
        }
    }
}
