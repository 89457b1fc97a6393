//! The single object UI code talks to: owns both controllers and enforces
//! that starting to listen silences any playback first.
//!
//! Playback does not stop an active listening session.

use crate::config::SpeechConfig;
use crate::error::SpeechResult;
use crate::input::{FinalTranscript, SpeechInputController};
use crate::language::Language;
use crate::output::{PlaybackCommand, PlaybackState, SpeechOutputController, UtteranceRequest};
use crate::platform::{RecognitionEngine, RecognitionEvent, SynthesisEngine, SynthesisEvent};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::info;

/// Everything the UI renders from the speech subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SpeechSnapshot {
    pub language: Language,
    pub recognition_supported: bool,
    pub is_listening: bool,
    pub transcript: String,
    pub playback: PlaybackState,
    /// User-facing message for the latest error, if any.
    pub error: Option<String>,
}

/// Owns both controllers and keeps them off the audio device at the same time.
pub struct SpeechCoordinator {
    output: SpeechOutputController,
    input: SpeechInputController,
    language: Language,
}

impl SpeechCoordinator {
    /// Wire both controllers. The receiver yields finalized transcripts.
    pub fn new(
        synthesis: Box<dyn SynthesisEngine>,
        recognition: Option<Box<dyn RecognitionEngine>>,
        config: SpeechConfig,
    ) -> (Self, mpsc::UnboundedReceiver<FinalTranscript>) {
        let language = config.language;
        let output = SpeechOutputController::new(synthesis, config.clone());
        let (input, transcripts) = SpeechInputController::new(recognition, config);
        (Self { output, input, language }, transcripts)
    }

    pub fn output(&self) -> &SpeechOutputController {
        &self.output
    }

    pub fn input(&self) -> &SpeechInputController {
        &self.input
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Start a transcription session, cancelling any playback first.
    pub fn start_listening(&mut self) -> SpeechResult<()> {
        if self.output.is_active() && !self.input.is_listening() {
            info!("silencing playback before listening");
            self.output.stop_playback();
        }
        self.input.start_listening()
    }

    pub fn stop_listening(&mut self) {
        self.input.stop_listening();
    }

    pub fn request_playback(&mut self, request: &UtteranceRequest) -> PlaybackCommand {
        self.output.request_playback(request)
    }

    pub fn stop_playback(&mut self) {
        self.output.stop_playback();
    }

    /// Switch the UI language. Playback in the old language is cancelled.
    pub fn set_language(&mut self, language: Language) {
        if self.language == language {
            return;
        }
        info!(from = %self.language, to = %language, "language changed");
        self.language = language;
        self.output.stop_playback();
        self.input.set_language(language);
    }

    pub fn handle_synthesis_event(&mut self, event: &SynthesisEvent) {
        self.output.handle_event(event);
    }

    pub fn handle_recognition_event(&mut self, event: &RecognitionEvent) {
        self.input.handle_event(event);
    }

    /// The platform reported a new voice list.
    pub fn voices_changed(&mut self) {
        self.output.refresh_voices();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.input.next_deadline()
    }

    pub fn poll_timers(&mut self, now: Instant) {
        self.input.poll_timers(now);
    }

    pub fn snapshot(&self) -> SpeechSnapshot {
        let error = self
            .input
            .error()
            .map(|e| e.user_message())
            .or_else(|| self.output.last_error().map(|e| e.to_string()));
        SpeechSnapshot {
            language: self.language,
            recognition_supported: self.input.is_supported(),
            is_listening: self.input.is_listening(),
            transcript: self.input.transcript(),
            playback: self.output.state().clone(),
            error,
        }
    }

    /// Stop everything without delivering pending transcripts.
    pub fn shutdown(&mut self) {
        self.input.shutdown();
        self.output.stop_playback();
    }
}

impl Drop for SpeechCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
