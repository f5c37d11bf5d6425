//! Voice catalogs for the command-line backends.

use signvox_core::VoiceDescriptor;
use std::path::{Path, PathBuf};

/// Parse the table printed by `espeak-ng --voices`:
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
///  2  en-us           --/M      English_(America)  gmw/en-US            (en 3)
/// ```
///
/// The language column doubles as the voice id since espeak accepts it for `-v`.
pub fn parse_espeak_voices(output: &str) -> Vec<VoiceDescriptor> {
    output
        .lines()
        .filter(|line| !line.trim_start().starts_with("Pty"))
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 5 {
                return None;
            }
            let language = cols[1];
            Some(VoiceDescriptor {
                id: language.to_string(),
                name: cols[3].replace('_', " "),
                language: language.to_string(),
                is_local: true,
                is_default: language == "en",
            })
        })
        .collect()
}

/// Piper voice models: every `*.onnx` in `dir`, plus the explicitly configured model.
pub fn piper_voices(dir: Option<&Path>, configured: Option<&Path>) -> Vec<VoiceDescriptor> {
    let mut models: Vec<PathBuf> = Vec::new();
    if let Some(path) = configured {
        models.push(path.to_path_buf());
    }
    if let Some(dir) = dir {
        if let Ok(entries) = std::fs::read_dir(dir) {
            let mut found: Vec<PathBuf> = entries
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "onnx"))
                .filter(|p| Some(p.as_path()) != configured)
                .collect();
            found.sort();
            models.extend(found);
        }
    }

    models
        .into_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("piper")
                .to_string();
            VoiceDescriptor {
                id: path.to_string_lossy().to_string(),
                language: piper_language(&name),
                is_default: Some(path.as_path()) == configured,
                is_local: true,
                name,
            }
        })
        .collect()
}

/// `en_US-lessac-medium` → `en-US`
fn piper_language(model_name: &str) -> String {
    model_name
        .split('-')
        .next()
        .unwrap_or_default()
        .replace('_', "-")
}

/// Stand-in catalog when no synthesizer is installed
pub fn console_voice() -> VoiceDescriptor {
    VoiceDescriptor {
        id: "console".to_string(),
        name: "Console".to_string(),
        language: "en".to_string(),
        is_local: true,
        is_default: true,
    }
}
