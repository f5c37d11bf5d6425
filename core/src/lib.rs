// Signvox Core Library
// Speech queue coordination for recognized sign language

pub mod config;
pub mod context;
pub mod coordinator;
pub mod engine;
pub mod enhance;
pub mod service;
pub mod types;
pub mod utterance;
pub mod voice;

// Export core types
pub use config::{InitPolicy, SpeechConfig};
pub use context::{EmotionalContextTable, Tone, ToneProfile};
pub use coordinator::QueueCoordinator;
pub use engine::{playback_channel, PlaybackEventReceiver, PlaybackEventSender, SpeechEngine};
pub use enhance::TextEnhancer;
pub use service::{SpeechHandle, SpeechService};
pub use types::{
    CoordinatorStatus, PlaybackEvent, PlaybackRequest, Priority, Settings, SettingsUpdate,
    SpeechItem, UtteranceId, VoiceDescriptor,
};
pub use utterance::UtteranceBuilder;
pub use voice::VoiceSelector;

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Initialization error: voice catalog still empty after {attempts} attempts")]
    Initialization { attempts: u32 },

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Speech service is no longer running")]
    ServiceClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpeechError>;
