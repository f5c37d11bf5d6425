use crate::context::EmotionalContextTable;
use crate::types::Settings;
use crate::voice::DEFAULT_PREFERRED_VOICES;
use std::time::Duration;

/// Configuration for the speech coordinator
#[derive(Clone, Debug)]
pub struct SpeechConfig {
    /// Default acoustic parameters for signs without an emotional context
    pub settings: Settings,
    /// Voice name fragments tried in order when picking the initial voice
    pub preferred_voices: Vec<String>,
    /// Retry policy while waiting for the voice catalog
    pub init: InitPolicy,
    /// Sign tag → tone profile
    pub contexts: EmotionalContextTable,
}

/// Bounded retry with exponential backoff for voice catalog readiness
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for InitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: env_parse("SPEECH_INIT_ATTEMPTS").unwrap_or(10),
            initial_backoff_ms: env_parse("SPEECH_INIT_BACKOFF_MS").unwrap_or(100),
            max_backoff_ms: env_parse("SPEECH_INIT_MAX_BACKOFF_MS").unwrap_or(2_000),
        }
    }
}

impl InitPolicy {
    /// Delay before retry number `attempt` (1-based): doubles from the
    /// initial backoff, capped at `max_backoff_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        let defaults = Settings::default();
        let settings = Settings {
            rate: env_parse("SPEECH_RATE").unwrap_or(defaults.rate),
            pitch: env_parse("SPEECH_PITCH").unwrap_or(defaults.pitch),
            volume: env_parse("SPEECH_VOLUME").unwrap_or(defaults.volume),
            pause_between_ms: env_parse("SPEECH_PAUSE_MS").unwrap_or(defaults.pause_between_ms),
        };

        let preferred_voices = match std::env::var("SPEECH_PREFERRED_VOICES") {
            Ok(list) => list
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => DEFAULT_PREFERRED_VOICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        Self {
            settings,
            preferred_voices,
            init: InitPolicy::default(),
            contexts: EmotionalContextTable::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = InitPolicy {
            max_attempts: 8,
            initial_backoff_ms: 100,
            max_backoff_ms: 500,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(60), Duration::from_millis(500));
    }
}
