//! Voice ranking. Platform voice lists arrive late and differ between
//! browsers, so selection is a best-effort heuristic: it only promises to be
//! deterministic for a fixed list.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name fragments that usually mark a network/neural voice.
const QUALITY_MARKERS: &[(&str, i32)] = &[
    ("neural", 4),
    ("natural", 4),
    ("wavenet", 4),
    ("premium", 3),
    ("enhanced", 3),
    ("online", 2),
    ("google", 2),
];

/// Name fragments that usually mark a female voice.
const FEMALE_MARKERS: &[&str] = &[
    "female", "woman", "swara", "kalpana", "heera", "lekha", "neerja", "aditi", "raveena",
    "veena", "zira", "samantha", "susan", "hazel", "karen", "moira", "tessa", "fiona",
];

/// A voice as the platform reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformVoice {
    pub name: String,
    pub lang: String,
    #[serde(default)]
    pub is_default: bool,
}

impl PlatformVoice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self { name: name.into(), lang: lang.into(), is_default: false }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

/// A platform voice annotated with ranking heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceDescriptor {
    pub display_name: String,
    pub language_tag: String,
    pub is_likely_female: bool,
    pub quality_rank: i32,
    #[serde(skip)]
    is_default: bool,
}

impl VoiceDescriptor {
    pub fn from_platform(voice: &PlatformVoice) -> Self {
        let lowered = voice.name.to_lowercase();
        let quality_rank = QUALITY_MARKERS
            .iter()
            .filter(|(marker, _)| lowered.contains(marker))
            .map(|(_, score)| *score)
            .sum();
        let is_likely_female = FEMALE_MARKERS.iter().any(|m| lowered.contains(m));
        Self {
            display_name: voice.name.clone(),
            language_tag: normalize_tag(&voice.lang),
            is_likely_female,
            quality_rank,
            is_default: voice.is_default,
        }
    }

    fn primary_subtag(&self) -> &str {
        self.language_tag.split('-').next().unwrap_or_default()
    }
}

/// Cached, ranked view of the platform's voice list.
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    voices: Vec<VoiceDescriptor>,
}

impl VoiceCatalog {
    pub fn new(voices: &[PlatformVoice]) -> Self {
        let mut catalog = Self::default();
        catalog.refresh(voices);
        catalog
    }

    /// Replace the cache after the platform reported a voice-list change.
    pub fn refresh(&mut self, voices: &[PlatformVoice]) {
        self.voices = voices.iter().map(VoiceDescriptor::from_platform).collect();
        debug!(count = self.voices.len(), "voice catalog refreshed");
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn voices(&self) -> &[VoiceDescriptor] {
        &self.voices
    }

    /// Best voice for `locale`: exact tag, then same language, then the
    /// platform default. `None` leaves the choice to the engine.
    pub fn select(&self, locale: &str) -> Option<&VoiceDescriptor> {
        let locale = normalize_tag(locale);
        let language = locale.split('-').next().unwrap_or_default();

        best_ranked(self.voices.iter().filter(|v| v.language_tag == locale))
            .or_else(|| best_ranked(self.voices.iter().filter(|v| v.primary_subtag() == language)))
            .or_else(|| self.voices.iter().find(|v| v.is_default))
    }
}

/// Highest quality first, female voices before others, then list order.
fn best_ranked<'a>(candidates: impl Iterator<Item = &'a VoiceDescriptor>) -> Option<&'a VoiceDescriptor> {
    candidates.min_by_key(|v| (-v.quality_rank, !v.is_likely_female))
}

/// Lowercase language, uppercase region, `-` as separator (`hi_in` -> `hi-IN`).
fn normalize_tag(tag: &str) -> String {
    let mut parts = tag.trim().split(['-', '_']);
    let mut out = parts.next().unwrap_or_default().to_ascii_lowercase();
    for part in parts {
        out.push('-');
        if part.len() == 2 {
            out.push_str(&part.to_ascii_uppercase());
        } else {
            out.push_str(part);
        }
    }
    out
}
