//! Emotional context table: sign tag → acoustic profile and tone.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Qualitative tone attached to a sign; selects the text template
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Friendly,
    Grateful,
    Apologetic,
    Urgent,
    Polite,
    Warm,
    Positive,
    Concerned,
    /// No template. Unknown tone names deserialize to this.
    #[serde(other)]
    Neutral,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToneProfile {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub tone: Tone,
}

impl ToneProfile {
    pub const fn new(rate: f32, pitch: f32, volume: f32, tone: Tone) -> Self {
        Self {
            rate,
            pitch,
            volume,
            tone,
        }
    }
}

/// Static mapping consulted by both the text enhancer and the utterance builder.
/// Keys are fixed once the coordinator is constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionalContextTable {
    entries: HashMap<String, ToneProfile>,
}

impl Default for EmotionalContextTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert("hello", ToneProfile::new(1.1, 1.1, 0.95, Tone::Friendly));
        table.insert("thank_you", ToneProfile::new(0.9, 1.0, 0.85, Tone::Grateful));
        table.insert("sorry", ToneProfile::new(0.8, 0.9, 0.8, Tone::Apologetic));
        table.insert("help", ToneProfile::new(1.0, 1.2, 0.9, Tone::Urgent));
        table.insert("please", ToneProfile::new(0.9, 1.05, 0.85, Tone::Polite));
        table.insert("love", ToneProfile::new(0.85, 1.0, 0.9, Tone::Warm));
        table.insert("good", ToneProfile::new(1.05, 1.1, 0.9, Tone::Positive));
        table.insert("bad", ToneProfile::new(0.95, 0.9, 0.85, Tone::Concerned));
        table
    }
}

impl EmotionalContextTable {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, sign_type: &str) -> Option<&ToneProfile> {
        self.entries.get(sign_type)
    }

    /// Add or replace an entry. Only meaningful before the table is handed
    /// to a coordinator.
    pub fn insert(&mut self, sign_type: impl Into<String>, profile: ToneProfile) {
        self.entries.insert(sign_type.into(), profile);
    }

    /// Known sign tags, sorted
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.entries.keys().cloned().collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
