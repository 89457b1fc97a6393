//! # Mitra Speech - voice input and output for Bharat Mitra
//!
//! Two controllers share one UI thread and never drive the audio device at
//! the same time:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      SpeechCoordinator                       │
//! │  ┌──────────────────────┐        ┌───────────────────────┐   │
//! │  │ SpeechInputController│ cancel │ SpeechOutputController│   │
//! │  │ Idle ⇄ Listening     │───────→│ Idle/Speaking/Paused  │   │
//! │  │ inactivity timer     │        │ clean → detect → voice│   │
//! │  └──────────┬───────────┘        └───────────┬───────────┘   │
//! │             ↓                                ↓               │
//! │     RecognitionEngine                 SynthesisEngine        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engines are traits supplied by the host. Their callbacks come back
//! as event values carrying the token of the run that produced them, so
//! stale events from cancelled runs are recognised and dropped.

pub mod clean;
pub mod config;
pub mod coordinator;
pub mod driver;
pub mod error;
pub mod input;
pub mod language;
pub mod output;
pub mod platform;
pub mod scripted;
pub mod voice;

pub use clean::clean_for_speech;
pub use config::SpeechConfig;
pub use coordinator::{SpeechCoordinator, SpeechSnapshot};
pub use driver::{spawn_speech_driver, SpeechCommand, SpeechHandle};
pub use error::{RecognitionError, SpeechError, SpeechResult};
pub use input::{FinalTranscript, FinalizeReason, ListeningStatus, SpeechInputController};
pub use language::{Language, LanguageHint, ScriptDetector};
pub use output::{PlaybackCommand, PlaybackState, PlaybackStatus, SpeechOutputController, UtteranceRequest};
pub use platform::{
    RecognitionEngine, RecognitionErrorCode, RecognitionEvent, RecognitionEventKind, RecognitionSettings,
    ResultFragment, SessionToken, SynthesisEngine, SynthesisErrorCode, SynthesisEvent, SynthesisEventKind,
    Utterance, UtteranceToken,
};
pub use scripted::{RecognitionCall, ScriptedRecognition, ScriptedSynthesis, SynthesisCall};
pub use voice::{PlatformVoice, VoiceCatalog, VoiceDescriptor};
