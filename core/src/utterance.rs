use crate::context::EmotionalContextTable;
use crate::enhance::TextEnhancer;
use crate::types::{PlaybackRequest, Settings, SpeechItem, VoiceDescriptor};

/// Composes enhanced text, the held voice and acoustic parameters into a
/// single playback request.
pub struct UtteranceBuilder<'a> {
    contexts: &'a EmotionalContextTable,
}

impl<'a> UtteranceBuilder<'a> {
    pub fn new(contexts: &'a EmotionalContextTable) -> Self {
        Self { contexts }
    }

    pub fn build(
        &self,
        item: &SpeechItem,
        voice: Option<&VoiceDescriptor>,
        defaults: &Settings,
    ) -> PlaybackRequest {
        let sign_type = item.sign_type.as_deref();
        let text = TextEnhancer::new(self.contexts).enhance(&item.text, sign_type);

        // A context entry replaces the whole triple; no per-field merge.
        let (rate, pitch, volume) = match sign_type.and_then(|tag| self.contexts.get(tag)) {
            Some(profile) => (profile.rate, profile.pitch, profile.volume),
            None => (defaults.rate, defaults.pitch, defaults.volume),
        };

        PlaybackRequest {
            text,
            voice: voice.cloned(),
            rate,
            pitch,
            volume,
        }
    }
}
