//! Synthesis engine capability consumed by the coordinator.
//!
//! The engine is opaque: it enumerates voices, accepts one playback request at a
//! time keyed by an [`UtteranceId`], and reports lifecycle callbacks as
//! [`PlaybackEvent`]s on the channel created by [`playback_channel`].

use crate::types::{PlaybackEvent, PlaybackRequest, UtteranceId, VoiceDescriptor};
use crate::{Result, SpeechError};
use async_trait::async_trait;
use tokio::sync::mpsc;

pub type PlaybackEventSender = mpsc::UnboundedSender<PlaybackEvent>;
pub type PlaybackEventReceiver = mpsc::UnboundedReceiver<PlaybackEvent>;

/// Channel on which an engine reports lifecycle callbacks.
/// The engine keeps the sender; the speech service consumes the receiver.
pub fn playback_channel() -> (PlaybackEventSender, PlaybackEventReceiver) {
    mpsc::unbounded_channel()
}

#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Display name for logs (e.g. "espeak-ng")
    fn name(&self) -> String;

    /// Current voice catalog. May be empty while the engine is still loading.
    async fn voices(&self) -> Result<Vec<VoiceDescriptor>>;

    /// Start playback of `request`. Must not block; completion is reported
    /// asynchronously as `Completed { id }` or `Failed { id, .. }`.
    fn submit(&self, id: UtteranceId, request: PlaybackRequest) -> Result<()>;

    /// Abort everything in flight. No callbacks are required for aborted requests.
    fn cancel_all(&self);

    /// Suspend sound output of the current request
    fn pause(&self);

    fn resume(&self);

    /// Synthesize `request` to WAV bytes without playing it.
    async fn render(&self, _request: PlaybackRequest) -> Result<Vec<u8>> {
        Err(SpeechError::Unsupported(format!(
            "{} cannot render audio to a buffer",
            self.name()
        )))
    }
}
