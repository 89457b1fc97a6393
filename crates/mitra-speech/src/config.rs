//! Speech configuration.
//!
//! Loaded from built-in defaults, then an optional file, then the environment:
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | MITRA_SPEECH_CONFIG | config/speech | Config file path (any format the `config` crate reads). |
//! | MITRA_SPEECH__LANGUAGE | en | Recognition language (`en` or `hi`). |
//! | MITRA_SPEECH__PRIMARY_LOCALE | en-IN | Locale tag for English. |
//! | MITRA_SPEECH__SECONDARY_LOCALE | hi-IN | Locale tag for Hindi. |
//! | MITRA_SPEECH__INACTIVITY_TIMEOUT_MS | 2500 | Silence before a transcript is auto-submitted. |
//! | MITRA_SPEECH__RESTART_DELAY_MS | 300 | Delay before restarting an engine that ended on its own. |
//! | MITRA_SPEECH__SPEECH_RATE | 0.95 | Synthesis rate. |
//! | MITRA_SPEECH__SPEECH_PITCH | 1.0 | Synthesis pitch. |
//! | MITRA_SPEECH__DETECTION_THRESHOLD | 0.15 | Devanagari share above which text is Hindi. |

use crate::error::{SpeechError, SpeechResult};
use crate::language::{Language, DEFAULT_DETECTION_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/speech";

fn default_primary_locale() -> String {
    Language::English.default_locale().to_string()
}

fn default_secondary_locale() -> String {
    Language::Hindi.default_locale().to_string()
}

fn default_inactivity_timeout_ms() -> u64 {
    2500
}

fn default_restart_delay_ms() -> u64 {
    300
}

fn default_speech_rate() -> f32 {
    0.95
}

fn default_speech_pitch() -> f32 {
    1.0
}

fn default_detection_threshold() -> f32 {
    DEFAULT_DETECTION_THRESHOLD
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Language used for recognition and for `LanguageHint::Primary`/`Secondary` resolution.
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_primary_locale")]
    pub primary_locale: String,
    #[serde(default = "default_secondary_locale")]
    pub secondary_locale: String,
    #[serde(default = "default_inactivity_timeout_ms")]
    pub inactivity_timeout_ms: u64,
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "default_speech_pitch")]
    pub speech_pitch: f32,
    #[serde(default = "default_detection_threshold")]
    pub detection_threshold: f32,
    #[serde(default = "default_true")]
    pub continuous: bool,
    #[serde(default = "default_true")]
    pub interim_results: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            primary_locale: default_primary_locale(),
            secondary_locale: default_secondary_locale(),
            inactivity_timeout_ms: default_inactivity_timeout_ms(),
            restart_delay_ms: default_restart_delay_ms(),
            speech_rate: default_speech_rate(),
            speech_pitch: default_speech_pitch(),
            detection_threshold: default_detection_threshold(),
            continuous: true,
            interim_results: true,
        }
    }
}

impl SpeechConfig {
    /// Load from `MITRA_SPEECH_CONFIG` (or `config/speech`) plus environment overrides.
    pub fn load() -> SpeechResult<Self> {
        let path = std::env::var("MITRA_SPEECH_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from an explicit file path, extension optional. A missing file is not an error.
    pub fn load_from(path: &Path) -> SpeechResult<Self> {
        // `with_name` also finds `config/speech.toml` when given `config/speech`.
        let built = config::Config::builder()
            .add_source(config::File::with_name(&path.to_string_lossy()).required(false))
            .add_source(config::Environment::with_prefix("MITRA_SPEECH").separator("__"))
            .build()?;

        let cfg: SpeechConfig = built.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> SpeechResult<()> {
        if self.inactivity_timeout_ms == 0 {
            return Err(SpeechError::Config("inactivity_timeout_ms must be > 0".to_string()));
        }
        if self.restart_delay_ms == 0 {
            return Err(SpeechError::Config("restart_delay_ms must be > 0".to_string()));
        }
        if !(0.1..=10.0).contains(&self.speech_rate) {
            return Err(SpeechError::Config(format!(
                "speech_rate {} outside 0.1..=10",
                self.speech_rate
            )));
        }
        if !(0.0..=2.0).contains(&self.speech_pitch) {
            return Err(SpeechError::Config(format!(
                "speech_pitch {} outside 0..=2",
                self.speech_pitch
            )));
        }
        if !(self.detection_threshold > 0.0 && self.detection_threshold < 1.0) {
            return Err(SpeechError::Config(format!(
                "detection_threshold {} outside (0, 1)",
                self.detection_threshold
            )));
        }
        if self.primary_locale.trim().is_empty() || self.secondary_locale.trim().is_empty() {
            return Err(SpeechError::Config("locale tags must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn locale_for(&self, language: Language) -> &str {
        match language {
            Language::English => &self.primary_locale,
            Language::Hindi => &self.secondary_locale,
        }
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}
