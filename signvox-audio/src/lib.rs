//! Signvox audio: a [`SpeechEngine`](signvox_core::SpeechEngine) that drives
//! local command-line synthesizers (Piper, espeak-ng) and WAV players.

mod utils;

pub mod cli;
pub mod voices;
pub mod wav;

pub use cli::{Backend, CliEngineConfig, CliSpeechEngine};
