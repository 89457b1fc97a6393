//! **Platform capabilities**: the speech engines the host environment provides.
//!
//! The controllers never probe for engines at runtime. The host hands in an
//! implementation of [`SynthesisEngine`] and, when the environment has one, a
//! [`RecognitionEngine`]. Engine calls are fire-and-forget; outcomes come back
//! later as [`SynthesisEvent`] / [`RecognitionEvent`] values tagged with the
//! token of the run that produced them.

use crate::error::SpeechResult;
use crate::voice::PlatformVoice;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one utterance handed to the synthesis engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UtteranceToken(pub u64);

/// Identifies one run of the recognition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionToken(pub u64);

impl fmt::Display for UtteranceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utt-{}", self.0)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec-{}", self.0)
    }
}

/// Fully resolved speech request as the synthesis engine receives it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utterance {
    pub token: UtteranceToken,
    /// Cleaned text; never empty.
    pub text: String,
    /// BCP-47 tag, taken from the chosen voice when there is one.
    pub language_tag: String,
    /// Platform voice name, `None` to let the engine pick its default.
    pub voice_name: Option<String>,
    pub rate: f32,
    pub pitch: f32,
}

/// Text-to-speech engine (browser `speechSynthesis` or equivalent).
pub trait SynthesisEngine: Send {
    /// Queue an utterance for playback.
    fn speak(&mut self, utterance: &Utterance);
    /// Drop the current and all queued utterances.
    fn cancel(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    /// Currently known voices. May be empty until the platform finishes loading.
    fn voices(&self) -> Vec<PlatformVoice>;
}

/// Settings applied to a single recognition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognitionSettings {
    pub language_tag: String,
    pub continuous: bool,
    pub interim_results: bool,
}

/// Speech-to-text engine (browser `SpeechRecognition` or equivalent).
pub trait RecognitionEngine: Send {
    /// Begin capturing. Can fail synchronously, e.g. when the engine is still
    /// shutting down a previous run.
    fn start(&mut self, session: SessionToken, settings: &RecognitionSettings) -> SpeechResult<()>;
    /// Stop capturing and flush pending results.
    fn stop(&mut self);
    /// Stop capturing and discard pending results.
    fn abort(&mut self);
}

/// Error codes reported by the synthesis engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SynthesisErrorCode {
    Canceled,
    Interrupted,
    AudioBusy,
    SynthesisFailed,
    LanguageUnavailable,
    VoiceUnavailable,
    Other(String),
}

impl SynthesisErrorCode {
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "canceled" => SynthesisErrorCode::Canceled,
            "interrupted" => SynthesisErrorCode::Interrupted,
            "audio-busy" => SynthesisErrorCode::AudioBusy,
            "synthesis-failed" => SynthesisErrorCode::SynthesisFailed,
            "language-unavailable" => SynthesisErrorCode::LanguageUnavailable,
            "voice-unavailable" => SynthesisErrorCode::VoiceUnavailable,
            other => SynthesisErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SynthesisErrorCode::Canceled => "canceled",
            SynthesisErrorCode::Interrupted => "interrupted",
            SynthesisErrorCode::AudioBusy => "audio-busy",
            SynthesisErrorCode::SynthesisFailed => "synthesis-failed",
            SynthesisErrorCode::LanguageUnavailable => "language-unavailable",
            SynthesisErrorCode::VoiceUnavailable => "voice-unavailable",
            SynthesisErrorCode::Other(code) => code,
        }
    }

    /// Codes produced by cancelling an utterance rather than by a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SynthesisErrorCode::Canceled | SynthesisErrorCode::Interrupted)
    }
}

/// Error codes reported by the recognition engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecognitionErrorCode {
    NoSpeech,
    Aborted,
    AudioCapture,
    Network,
    NotAllowed,
    ServiceNotAllowed,
    BadGrammar,
    LanguageNotSupported,
    Other(String),
}

impl RecognitionErrorCode {
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "no-speech" => RecognitionErrorCode::NoSpeech,
            "aborted" => RecognitionErrorCode::Aborted,
            "audio-capture" => RecognitionErrorCode::AudioCapture,
            "network" => RecognitionErrorCode::Network,
            "not-allowed" => RecognitionErrorCode::NotAllowed,
            "service-not-allowed" => RecognitionErrorCode::ServiceNotAllowed,
            "bad-grammar" => RecognitionErrorCode::BadGrammar,
            "language-not-supported" => RecognitionErrorCode::LanguageNotSupported,
            other => RecognitionErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecognitionErrorCode::NoSpeech => "no-speech",
            RecognitionErrorCode::Aborted => "aborted",
            RecognitionErrorCode::AudioCapture => "audio-capture",
            RecognitionErrorCode::Network => "network",
            RecognitionErrorCode::NotAllowed => "not-allowed",
            RecognitionErrorCode::ServiceNotAllowed => "service-not-allowed",
            RecognitionErrorCode::BadGrammar => "bad-grammar",
            RecognitionErrorCode::LanguageNotSupported => "language-not-supported",
            RecognitionErrorCode::Other(code) => code,
        }
    }
}

/// Callback from the synthesis engine for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisEvent {
    pub token: UtteranceToken,
    pub kind: SynthesisEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisEventKind {
    Started,
    Paused,
    Resumed,
    Ended,
    Failed(SynthesisErrorCode),
}

/// One recognised segment within a result event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFragment {
    pub text: String,
    pub is_final: bool,
}

impl ResultFragment {
    pub fn interim(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_final: false }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_final: true }
    }
}

/// Callback from the recognition engine for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionEvent {
    pub session: SessionToken,
    pub kind: RecognitionEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEventKind {
    Started,
    /// Fragments from the engine's `resultIndex` onward.
    Results(Vec<ResultFragment>),
    Ended,
    Failed(RecognitionErrorCode),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognition_codes_parse_platform_strings() {
        assert_eq!(RecognitionErrorCode::parse("no-speech"), RecognitionErrorCode::NoSpeech);
        assert_eq!(
            RecognitionErrorCode::parse("service-not-allowed"),
            RecognitionErrorCode::ServiceNotAllowed
        );
        let odd = RecognitionErrorCode::parse("phonemes-exhausted");
        assert_eq!(odd.as_str(), "phonemes-exhausted");
    }

    #[test]
    fn cancellation_codes_are_recognised() {
        assert!(SynthesisErrorCode::parse("interrupted").is_cancellation());
        assert!(SynthesisErrorCode::parse("canceled").is_cancellation());
        assert!(!SynthesisErrorCode::parse("audio-busy").is_cancellation());
    }
}
