//! Tone-aware text shaping applied before synthesis.
//!
//! Two passes, always in this order:
//! 1. Tone wrapping: the sign's tone selects one fixed template that embeds the
//!    original text verbatim.
//! 2. Prosodic punctuation: `.` becomes an ellipsis, `!` and `?` are kept, and
//!    each is followed by a single space to give the engine a breathing pause.
//!    Punctuation introduced by the template is expanded as well.

use crate::context::{EmotionalContextTable, Tone};

pub struct TextEnhancer<'a> {
    contexts: &'a EmotionalContextTable,
}

impl<'a> TextEnhancer<'a> {
    pub fn new(contexts: &'a EmotionalContextTable) -> Self {
        Self { contexts }
    }

    pub fn enhance(&self, text: &str, sign_type: Option<&str>) -> String {
        let tone = sign_type
            .and_then(|tag| self.contexts.get(tag))
            .map(|profile| profile.tone);
        let wrapped = match tone {
            Some(tone) => wrap_with_tone(tone, text),
            None => text.to_string(),
        };
        expand_punctuation(&wrapped)
    }
}

/// Apply the single template keyed by `tone`.
pub fn wrap_with_tone(tone: Tone, text: &str) -> String {
    match tone {
        Tone::Friendly => format!("Hello there! {}", text),
        Tone::Grateful => format!("{}. I really appreciate it.", text),
        Tone::Apologetic => format!("I'm {}. Please forgive me.", text),
        Tone::Urgent => format!("I need {}. Can you assist me?", text),
        Tone::Polite => format!("{}. Would that be possible?", text),
        Tone::Warm => format!("I {} you so much.", text),
        Tone::Positive => format!("That's {}! Great job!", text),
        Tone::Concerned => format!("That's {}. I'm worried about this.", text),
        Tone::Neutral => text.to_string(),
    }
}

/// Expand sentence punctuation into pause-friendly forms.
///
/// The trailing space is only inserted when the next character is not
/// already whitespace, so `"Hi. Bye!"` becomes `"Hi... Bye! "`.
pub fn expand_punctuation(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let replacement = match c {
            '.' => "...",
            '!' => "!",
            '?' => "?",
            other => {
                out.push(other);
                continue;
            }
        };
        out.push_str(replacement);
        if !chars.peek().is_some_and(|next| next.is_whitespace()) {
            out.push(' ');
        }
    }
    out
}
