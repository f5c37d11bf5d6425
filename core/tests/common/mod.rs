//! Shared fakes for coordinator and service tests

#![allow(dead_code)]

use async_trait::async_trait;
use signvox_core::{
    InitPolicy, PlaybackEvent, PlaybackEventSender, PlaybackRequest, Result, Settings,
    SpeechConfig, SpeechEngine, SpeechError, UtteranceId, VoiceDescriptor,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn voice(name: &str, language: &str) -> VoiceDescriptor {
    VoiceDescriptor {
        id: name.to_lowercase(),
        name: name.to_string(),
        language: language.to_string(),
        is_local: true,
        is_default: false,
    }
}

pub fn test_config() -> SpeechConfig {
    SpeechConfig {
        settings: Settings {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            pause_between_ms: 5,
        },
        preferred_voices: vec!["zira".into()],
        init: InitPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        },
        ..SpeechConfig::default()
    }
}

/// Engine that records submissions and only reports callbacks when told to.
#[derive(Default)]
pub struct RecordingEngine {
    catalog: Mutex<Vec<VoiceDescriptor>>,
    /// Number of `voices()` calls that return an empty catalog first
    empty_polls: AtomicUsize,
    voice_calls: AtomicUsize,
    submitted: Mutex<Vec<(UtteranceId, PlaybackRequest)>>,
    cancels: AtomicUsize,
    pauses: AtomicUsize,
    resumes: AtomicUsize,
    refuse_submit: AtomicBool,
    /// When set, every submission is completed immediately on this channel
    auto_complete: Mutex<Option<PlaybackEventSender>>,
    events: Mutex<Option<PlaybackEventSender>>,
}

impl RecordingEngine {
    pub fn with_voices(voices: Vec<VoiceDescriptor>) -> Self {
        let engine = Self::default();
        *engine.catalog.lock().unwrap() = voices;
        engine
    }

    pub fn empty_polls(self, n: usize) -> Self {
        self.empty_polls.store(n, Ordering::SeqCst);
        self
    }

    pub fn reporting_to(self, events: PlaybackEventSender) -> Self {
        *self.events.lock().unwrap() = Some(events);
        self
    }

    pub fn auto_completing(self, events: PlaybackEventSender) -> Self {
        *self.auto_complete.lock().unwrap() = Some(events);
        self
    }

    pub fn refuse_submissions(&self, refuse: bool) {
        self.refuse_submit.store(refuse, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<(UtteranceId, PlaybackRequest)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submitted_texts(&self) -> Vec<String> {
        self.submitted()
            .into_iter()
            .map(|(_, req)| req.text)
            .collect()
    }

    pub fn last_id(&self) -> Option<UtteranceId> {
        self.submitted.lock().unwrap().last().map(|(id, _)| *id)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn voice_calls(&self) -> usize {
        self.voice_calls.load(Ordering::SeqCst)
    }

    /// Report completion of `id` on the attached event channel
    pub fn complete(&self, id: UtteranceId) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            tx.send(PlaybackEvent::Completed { id }).unwrap();
        }
    }

    pub fn fail(&self, id: UtteranceId, reason: &str) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            tx.send(PlaybackEvent::Failed {
                id,
                reason: reason.to_string(),
            })
            .unwrap();
        }
    }
}

#[async_trait]
impl SpeechEngine for RecordingEngine {
    fn name(&self) -> String {
        "recording".to_string()
    }

    async fn voices(&self) -> Result<Vec<VoiceDescriptor>> {
        self.voice_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.empty_polls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.empty_polls.store(remaining - 1, Ordering::SeqCst);
            return Ok(Vec::new());
        }
        Ok(self.catalog.lock().unwrap().clone())
    }

    fn submit(&self, id: UtteranceId, request: PlaybackRequest) -> Result<()> {
        if self.refuse_submit.load(Ordering::SeqCst) {
            return Err(SpeechError::Engine("device busy".into()));
        }
        self.submitted.lock().unwrap().push((id, request));
        if let Some(tx) = self.auto_complete.lock().unwrap().as_ref() {
            let _ = tx.send(PlaybackEvent::Started { id });
            let _ = tx.send(PlaybackEvent::Completed { id });
        }
        Ok(())
    }

    fn cancel_all(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }
}
