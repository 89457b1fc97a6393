//! Supported languages and script-based language detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fraction of Devanagari characters above which text is treated as Hindi.
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.15;

/// Languages the assistant speaks. English is primary, Hindi secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[serde(alias = "en")]
    English,
    #[serde(alias = "hi")]
    Hindi,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
        }
    }

    /// Locale tag used when no override is configured.
    pub fn default_locale(self) -> &'static str {
        match self {
            Language::English => "en-IN",
            Language::Hindi => "hi-IN",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("en") || s.eq_ignore_ascii_case("english") {
            Ok(Language::English)
        } else if s.eq_ignore_ascii_case("hi") || s.eq_ignore_ascii_case("hindi") {
            Ok(Language::Hindi)
        } else {
            Err(format!("unsupported language: {s}"))
        }
    }
}

/// Which language a playback request should be spoken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageHint {
    /// Detect from the text itself.
    #[default]
    Auto,
    Primary,
    Secondary,
}

impl FromStr for LanguageHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(LanguageHint::Auto),
            "primary" | "en" => Ok(LanguageHint::Primary),
            "secondary" | "hi" => Ok(LanguageHint::Secondary),
            other => Err(format!("unknown language hint: {other}")),
        }
    }
}

impl From<Language> for LanguageHint {
    fn from(lang: Language) -> Self {
        match lang {
            Language::English => LanguageHint::Primary,
            Language::Hindi => LanguageHint::Secondary,
        }
    }
}

/// Classifies text as Hindi or English by its share of Devanagari characters.
#[derive(Debug, Clone, Copy)]
pub struct ScriptDetector {
    threshold: f32,
}

impl ScriptDetector {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Ratio of Devanagari characters to all non-whitespace characters.
    pub fn devanagari_ratio(text: &str) -> f32 {
        let mut total = 0usize;
        let mut devanagari = 0usize;
        for c in text.chars().filter(|c| !c.is_whitespace()) {
            total += 1;
            if is_devanagari(c) {
                devanagari += 1;
            }
        }
        if total == 0 {
            return 0.0;
        }
        devanagari as f32 / total as f32
    }

    pub fn detect(&self, text: &str) -> Language {
        if Self::devanagari_ratio(text) > self.threshold {
            Language::Hindi
        } else {
            Language::English
        }
    }

    /// Resolve a hint to a concrete language, detecting from `text` for `Auto`.
    pub fn resolve(&self, hint: LanguageHint, text: &str) -> Language {
        match hint {
            LanguageHint::Primary => Language::English,
            LanguageHint::Secondary => Language::Hindi,
            LanguageHint::Auto => self.detect(text),
        }
    }
}

impl Default for ScriptDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DETECTION_THRESHOLD)
    }
}

fn is_devanagari(c: char) -> bool {
    matches!(c as u32, 0x0900..=0x097F | 0xA8E0..=0xA8FF)
}
