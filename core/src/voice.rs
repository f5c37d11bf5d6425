//! Voice selection with deterministic fallback.

use crate::types::VoiceDescriptor;

/// Voices known to sound natural, in order of preference
pub const DEFAULT_PREFERRED_VOICES: &[&str] = &[
    "samantha",
    "zira",
    "google us english",
    "david",
    "mark",
    "hazel",
    "alex",
];

#[derive(Clone, Debug)]
pub struct VoiceSelector {
    /// Lowercased name fragments, matched as substrings
    preferred: Vec<String>,
}

impl Default for VoiceSelector {
    fn default() -> Self {
        Self::new(DEFAULT_PREFERRED_VOICES.iter().copied())
    }
}

impl VoiceSelector {
    pub fn new<I, S>(preferred: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            preferred: preferred
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn preferred(&self) -> &[String] {
        &self.preferred
    }

    /// Pick a voice from `catalog`.
    ///
    /// Preference order wins over catalog order: the first preferred name that
    /// matches any entry decides. Without a match, the first local English
    /// voice is used, then simply the first entry. An empty catalog yields
    /// `None` and the caller is expected to retry once voices have loaded.
    pub fn select_best_voice(&self, catalog: &[VoiceDescriptor]) -> Option<VoiceDescriptor> {
        for wanted in &self.preferred {
            if let Some(voice) = catalog
                .iter()
                .find(|v| v.name.to_lowercase().contains(wanted.as_str()))
            {
                return Some(voice.clone());
            }
        }
        catalog
            .iter()
            .find(|v| v.is_english() && v.is_local)
            .or_else(|| catalog.first())
            .cloned()
    }
}

/// Exact-name lookup used by explicit voice changes
pub fn find_by_name<'a>(catalog: &'a [VoiceDescriptor], name: &str) -> Option<&'a VoiceDescriptor> {
    catalog.iter().find(|v| v.name == name)
}
