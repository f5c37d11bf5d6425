//! Single-consumer speech queue.
//!
//! States are `Idle` (no utterance in flight) and `Speaking` (exactly one
//! utterance submitted to the engine). The in-flight [`UtteranceId`] is the only
//! mutual-exclusion mechanism: engine callbacks carrying any other id are stale
//! (cancelled by `stop()` or urgent preemption) and are ignored.
//!
//! The coordinator never sleeps on its own except during [`QueueCoordinator::initialize`].
//! The inter-utterance pause after a completion is returned to the caller of
//! [`QueueCoordinator::handle_event`], which must call
//! [`QueueCoordinator::try_start_next`] once it has elapsed.

use crate::config::{InitPolicy, SpeechConfig};
use crate::context::EmotionalContextTable;
use crate::engine::SpeechEngine;
use crate::enhance::TextEnhancer;
use crate::types::{
    CoordinatorStatus, PlaybackEvent, PlaybackRequest, Priority, Settings, SettingsUpdate,
    SpeechItem, UtteranceId, VoiceDescriptor,
};
use crate::utterance::UtteranceBuilder;
use crate::voice::{find_by_name, VoiceSelector};
use crate::{Result, SpeechError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct QueueCoordinator {
    engine: Arc<dyn SpeechEngine>,
    contexts: EmotionalContextTable,
    selector: VoiceSelector,
    init_policy: InitPolicy,
    settings: Settings,
    queue: VecDeque<SpeechItem>,
    catalog: Vec<VoiceDescriptor>,
    current_voice: Option<VoiceDescriptor>,
    in_flight: Option<UtteranceId>,
    next_id: u64,
    initialized: bool,
}

impl QueueCoordinator {
    pub fn new(engine: Arc<dyn SpeechEngine>, config: SpeechConfig) -> Self {
        Self {
            engine,
            contexts: config.contexts,
            selector: VoiceSelector::new(&config.preferred_voices),
            init_policy: config.init,
            settings: config.settings,
            queue: VecDeque::new(),
            catalog: Vec::new(),
            current_voice: None,
            in_flight: None,
            next_id: 0,
            initialized: false,
        }
    }

    /// Load the voice catalog and pick the initial voice.
    ///
    /// Voices may take a while to appear, so enumeration is retried with
    /// exponential backoff up to `InitPolicy::max_attempts` times. Enumeration
    /// errors count as an empty catalog. Once initialized, further calls are
    /// no-ops.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let max_attempts = self.init_policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.engine.voices().await {
                Ok(voices) if !voices.is_empty() => {
                    self.catalog = voices;
                    if self.current_voice.is_none() {
                        self.current_voice = self.selector.select_best_voice(&self.catalog);
                    }
                    self.initialized = true;
                    info!(
                        target: "speech",
                        engine = %self.engine.name(),
                        voices = self.catalog.len(),
                        voice = ?self.current_voice_name(),
                        attempt,
                        "Speech coordinator initialized"
                    );
                    return Ok(());
                }
                Ok(_) => {
                    debug!(target: "speech", attempt, "Voice catalog still empty");
                }
                Err(e) => {
                    warn!(target: "speech", attempt, error = %e, "Voice enumeration failed");
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.init_policy.backoff(attempt)).await;
            }
        }

        warn!(
            target: "speech",
            attempts = max_attempts,
            "Giving up waiting for the voice catalog"
        );
        Err(SpeechError::Initialization {
            attempts: max_attempts,
        })
    }

    pub fn speak(&mut self, text: impl Into<String>, sign_type: Option<&str>, priority: Priority) {
        self.enqueue(SpeechItem::new(text, sign_type, priority));
    }

    /// Append `item` to the queue. An urgent item first aborts the current
    /// utterance and discards everything queued, becoming the sole entry.
    pub fn enqueue(&mut self, item: SpeechItem) {
        if item.priority == Priority::Urgent {
            self.abort_current_and_clear_queue();
        }
        debug!(
            target: "speech",
            priority = ?item.priority,
            sign_type = ?item.sign_type,
            queued = self.queue.len() + 1,
            "Enqueued speech item"
        );
        self.queue.push_back(item);
        if self.in_flight.is_none() {
            self.try_start_next();
        }
    }

    /// Submit the head of the queue unless an utterance is already in flight.
    /// Items the engine refuses synchronously are dropped and the next one is tried.
    pub fn try_start_next(&mut self) {
        while self.in_flight.is_none() {
            let Some(item) = self.queue.pop_front() else {
                return;
            };
            let id = self.mint_id();
            let request = UtteranceBuilder::new(&self.contexts).build(
                &item,
                self.current_voice.as_ref(),
                &self.settings,
            );
            self.in_flight = Some(id);
            debug!(target: "speech", id = %id, text = %request.text, "Starting utterance");

            if let Err(e) = self.engine.submit(id, request) {
                warn!(target: "speech", id = %id, error = %e, "Playback failed to start; dropping utterance");
                self.in_flight = None;
            }
        }
    }

    /// Apply an engine callback.
    ///
    /// Returns the pause to wait before calling [`Self::try_start_next`] when
    /// the current utterance completed normally.
    pub fn handle_event(&mut self, event: PlaybackEvent) -> Option<Duration> {
        let id = event.id();
        if self.in_flight != Some(id) {
            debug!(target: "speech", id = %id, "Ignoring callback for a cancelled utterance");
            return None;
        }

        match event {
            PlaybackEvent::Started { .. } => {
                debug!(target: "speech", id = %id, "Utterance started");
                None
            }
            PlaybackEvent::Completed { .. } => {
                self.in_flight = None;
                debug!(target: "speech", id = %id, remaining = self.queue.len(), "Utterance completed");
                Some(Duration::from_millis(self.settings.pause_between_ms))
            }
            PlaybackEvent::Failed { reason, .. } => {
                warn!(target: "speech", id = %id, reason = %reason, "Playback error; dropping utterance");
                self.in_flight = None;
                self.try_start_next();
                None
            }
        }
    }

    /// Cancel the current utterance and clear the queue. Idempotent.
    pub fn stop(&mut self) {
        self.abort_current_and_clear_queue();
    }

    pub fn pause(&self) {
        self.engine.pause();
    }

    pub fn resume(&self) {
        self.engine.resume();
    }

    pub fn voices(&self) -> &[VoiceDescriptor] {
        &self.catalog
    }

    /// Switch to the catalog voice named exactly `name`.
    /// Unknown names leave the current voice untouched.
    pub fn set_voice(&mut self, name: &str) -> bool {
        match find_by_name(&self.catalog, name) {
            Some(voice) => {
                info!(target: "speech", voice = %voice.name, "Voice changed");
                self.current_voice = Some(voice.clone());
                true
            }
            None => {
                debug!(target: "speech", requested = %name, "No voice with that name");
                false
            }
        }
    }

    /// Merge into the default settings. Affects the next built request only.
    pub fn update_settings(&mut self, update: SettingsUpdate) {
        self.settings.merge(update);
        debug!(target: "speech", settings = ?self.settings, "Settings updated");
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn status(&self) -> CoordinatorStatus {
        CoordinatorStatus {
            initialized: self.initialized,
            is_speaking: self.is_speaking(),
            queue_length: self.queue.len(),
            current_voice_name: self.current_voice_name(),
            settings: self.settings.clone(),
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn current_utterance(&self) -> Option<UtteranceId> {
        self.in_flight
    }

    pub fn current_voice(&self) -> Option<&VoiceDescriptor> {
        self.current_voice.as_ref()
    }

    pub fn contexts(&self) -> &EmotionalContextTable {
        &self.contexts
    }

    /// Enhanced text for `text`, without enqueueing anything
    pub fn preview(&self, text: &str, sign_type: Option<&str>) -> String {
        TextEnhancer::new(&self.contexts).enhance(text, sign_type)
    }

    /// Build a playback request with the current voice and settings, outside the queue
    pub fn materialize(&self, text: &str, sign_type: Option<&str>) -> PlaybackRequest {
        let item = SpeechItem::new(text, sign_type, Priority::Normal);
        UtteranceBuilder::new(&self.contexts).build(
            &item,
            self.current_voice.as_ref(),
            &self.settings,
        )
    }

    fn abort_current_and_clear_queue(&mut self) {
        let discarded = self.queue.len();
        self.queue.clear();
        if let Some(id) = self.in_flight.take() {
            self.engine.cancel_all();
            debug!(target: "speech", id = %id, discarded, "Cancelled current utterance");
        } else if discarded > 0 {
            debug!(target: "speech", discarded, "Cleared speech queue");
        }
    }

    fn current_voice_name(&self) -> Option<String> {
        self.current_voice.as_ref().map(|v| v.name.clone())
    }

    fn mint_id(&mut self) -> UtteranceId {
        self.next_id += 1;
        UtteranceId(self.next_id)
    }
}
