//! Actor that drives a [`QueueCoordinator`] from a tokio task.
//!
//! Commands from any number of [`SpeechHandle`]s and playback callbacks from the
//! engine are funneled into one loop, so every coordinator mutation happens on
//! the same task. The only timer is the inter-utterance pause: at most one
//! deadline is pending, and when it fires the loop asks the coordinator for
//! the next item.

use crate::config::SpeechConfig;
use crate::context::EmotionalContextTable;
use crate::coordinator::QueueCoordinator;
use crate::engine::{PlaybackEventReceiver, SpeechEngine};
use crate::enhance::TextEnhancer;
use crate::types::{
    CoordinatorStatus, PlaybackRequest, Priority, SettingsUpdate, SpeechItem, VoiceDescriptor,
};
use crate::{Result, SpeechError};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

enum Command {
    Initialize(oneshot::Sender<Result<()>>),
    Speak(SpeechItem),
    Stop(oneshot::Sender<()>),
    Pause,
    Resume,
    Voices(oneshot::Sender<Vec<VoiceDescriptor>>),
    SetVoice(String, oneshot::Sender<bool>),
    UpdateSettings(SettingsUpdate),
    Materialize {
        text: String,
        sign_type: Option<String>,
        reply: oneshot::Sender<PlaybackRequest>,
    },
}

pub struct SpeechService {
    engine: Arc<dyn SpeechEngine>,
    events: PlaybackEventReceiver,
    coordinator: QueueCoordinator,
}

impl SpeechService {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        events: PlaybackEventReceiver,
        config: SpeechConfig,
    ) -> Self {
        let coordinator = QueueCoordinator::new(Arc::clone(&engine), config);
        Self {
            engine,
            events,
            coordinator,
        }
    }

    /// Spawn the service loop. It runs until every [`SpeechHandle`] is dropped.
    pub fn start(self) -> (SpeechHandle, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(self.coordinator.status());
        let handle = SpeechHandle {
            commands: cmd_tx,
            status: status_rx,
            contexts: Arc::new(self.coordinator.contexts().clone()),
            engine: Arc::clone(&self.engine),
        };

        let join = tokio::spawn(self.run(cmd_rx, status_tx));
        (handle, join)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        status: watch::Sender<CoordinatorStatus>,
    ) {
        info!(target: "speech", engine = %self.engine.name(), "Speech service started");
        let mut resume_at: Option<Instant> = None;

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    let Some(cmd) = cmd else { break };
                    self.apply(cmd, &mut resume_at, &status).await;
                }
                Some(event) = self.events.recv() => {
                    if let Some(pause) = self.coordinator.handle_event(event) {
                        resume_at = Some(Instant::now() + pause);
                    }
                }
                _ = tokio::time::sleep_until(resume_at.unwrap_or_else(Instant::now)), if resume_at.is_some() => {
                    resume_at = None;
                    self.coordinator.try_start_next();
                }
            }
            status.send_replace(self.coordinator.status());
        }

        self.coordinator.stop();
        info!(target: "speech", "Speech service stopped");
    }

    async fn apply(
        &mut self,
        cmd: Command,
        resume_at: &mut Option<Instant>,
        status: &watch::Sender<CoordinatorStatus>,
    ) {
        match cmd {
            Command::Initialize(reply) => {
                let res = self.coordinator.initialize().await;
                status.send_replace(self.coordinator.status());
                let _ = reply.send(res);
            }
            Command::Speak(item) => self.coordinator.enqueue(item),
            Command::Stop(reply) => {
                *resume_at = None;
                self.coordinator.stop();
                status.send_replace(self.coordinator.status());
                let _ = reply.send(());
            }
            Command::Pause => self.coordinator.pause(),
            Command::Resume => self.coordinator.resume(),
            Command::Voices(reply) => {
                let _ = reply.send(self.coordinator.voices().to_vec());
            }
            Command::SetVoice(name, reply) => {
                let changed = self.coordinator.set_voice(&name);
                status.send_replace(self.coordinator.status());
                let _ = reply.send(changed);
            }
            Command::UpdateSettings(update) => self.coordinator.update_settings(update),
            Command::Materialize {
                text,
                sign_type,
                reply,
            } => {
                let _ = reply.send(self.coordinator.materialize(&text, sign_type.as_deref()));
            }
        }
    }
}

/// Cloneable front door to a running [`SpeechService`]
#[derive(Clone)]
pub struct SpeechHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<CoordinatorStatus>,
    contexts: Arc<EmotionalContextTable>,
    engine: Arc<dyn SpeechEngine>,
}

impl SpeechHandle {
    /// Load voices and select the initial one. Reports an initialization
    /// error once the retry policy is exhausted. Commands sent meanwhile are
    /// applied after initialization finishes.
    pub async fn initialize(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Initialize(tx))?;
        rx.await.map_err(|_| SpeechError::ServiceClosed)?
    }

    /// Queue text for playback. Never waits for the service.
    pub fn speak(
        &self,
        text: impl Into<String>,
        sign_type: Option<&str>,
        priority: Priority,
    ) -> Result<()> {
        self.send(Command::Speak(SpeechItem::new(text, sign_type, priority)))
    }

    /// Cancel playback and clear the queue. Resolves once the service has
    /// applied it, so a following `status()` reports idle with an empty queue.
    pub async fn stop(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Stop(tx))?;
        rx.await.map_err(|_| SpeechError::ServiceClosed)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    pub async fn voices(&self) -> Result<Vec<VoiceDescriptor>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Voices(tx))?;
        rx.await.map_err(|_| SpeechError::ServiceClosed)
    }

    pub async fn set_voice(&self, name: impl Into<String>) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::SetVoice(name.into(), tx))?;
        rx.await.map_err(|_| SpeechError::ServiceClosed)
    }

    pub fn update_settings(&self, update: SettingsUpdate) -> Result<()> {
        self.send(Command::UpdateSettings(update))
    }

    /// Latest published snapshot
    pub fn status(&self) -> CoordinatorStatus {
        self.status.borrow().clone()
    }

    /// Wait until the published status satisfies `pred`
    pub async fn wait_for<F>(&self, mut pred: F) -> Result<CoordinatorStatus>
    where
        F: FnMut(&CoordinatorStatus) -> bool,
    {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(|s| pred(s))
            .await
            .map_err(|_| SpeechError::ServiceClosed)?;
        Ok(status.clone())
    }

    /// Sign tags with an emotional context
    pub fn contexts(&self) -> Vec<String> {
        self.contexts.tags()
    }

    pub fn preview(&self, text: &str, sign_type: Option<&str>) -> String {
        TextEnhancer::new(&self.contexts).enhance(text, sign_type)
    }

    /// Synthesize to WAV bytes with the current voice and settings, bypassing the queue
    pub async fn render(&self, text: &str, sign_type: Option<&str>) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Materialize {
            text: text.to_string(),
            sign_type: sign_type.map(str::to_string),
            reply: tx,
        })?;
        let request = rx.await.map_err(|_| SpeechError::ServiceClosed)?;
        debug!(target: "speech", text = %request.text, "Rendering utterance");
        self.engine.render(request).await
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.commands
            .send(cmd)
            .map_err(|_| SpeechError::ServiceClosed)
    }
}
