//! **Speech Output Controller**: one utterance at a time, with play/pause/resume.
//!
//! State machine: `Idle → Speaking ⇄ Paused → Idle`. `Speaking` is entered only
//! when the engine reports the utterance started; cancel, end and failure all
//! return to `Idle`. Every utterance carries a fresh [`UtteranceToken`] and
//! events for any other token are dropped, so a late `Ended` from a superseded
//! utterance cannot clobber the current one.

use crate::clean::clean_for_speech;
use crate::config::SpeechConfig;
use crate::error::SpeechError;
use crate::language::{LanguageHint, ScriptDetector};
use crate::platform::{SynthesisEngine, SynthesisEvent, SynthesisEventKind, Utterance, UtteranceToken};
use crate::voice::VoiceCatalog;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A caller's request to have text read aloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtteranceRequest {
    pub text: String,
    pub correlation_id: String,
    #[serde(default)]
    pub language_hint: LanguageHint,
}

impl UtteranceRequest {
    pub fn new(text: impl Into<String>, correlation_id: impl Into<String>, language_hint: LanguageHint) -> Self {
        Self {
            text: text.into(),
            correlation_id: correlation_id.into(),
            language_hint,
        }
    }
}

/// Playback state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Speaking,
    Paused,
}

/// Playback status as exposed to the UI.
///
/// `active_correlation_id` is `Some` exactly when `status` is not `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub active_correlation_id: Option<String>,
}

impl PlaybackState {
    fn idle() -> Self {
        Self::default()
    }
}

/// What a call to [`SpeechOutputController::request_playback`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    /// Nothing speakable, or the same utterance is already starting.
    Ignored,
    Started(UtteranceToken),
    Paused,
    Resumed,
}

/// Utterance handed to the engine but not yet finished.
#[derive(Debug, Clone)]
struct InFlight {
    token: UtteranceToken,
    correlation_id: String,
}

/// Plays one cleaned utterance at a time through a [`SynthesisEngine`].
pub struct SpeechOutputController {
    engine: Box<dyn SynthesisEngine>,
    catalog: VoiceCatalog,
    detector: ScriptDetector,
    config: SpeechConfig,
    state: PlaybackState,
    in_flight: Option<InFlight>,
    next_token: u64,
    last_error: Option<SpeechError>,
}

impl SpeechOutputController {
    pub fn new(engine: Box<dyn SynthesisEngine>, config: SpeechConfig) -> Self {
        let catalog = VoiceCatalog::new(&engine.voices());
        if catalog.is_empty() {
            debug!("voice list empty at startup; waiting for voices-changed");
        }
        Self {
            engine,
            catalog,
            detector: ScriptDetector::new(config.detection_threshold),
            config,
            state: PlaybackState::idle(),
            in_flight: None,
            next_token: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    /// True when an utterance is speaking, paused, or handed to the engine and not yet started.
    pub fn is_active(&self) -> bool {
        self.in_flight.is_some() || self.state.status != PlaybackStatus::Idle
    }

    pub fn last_error(&self) -> Option<&SpeechError> {
        self.last_error.as_ref()
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    /// Speak `request`, or toggle pause/resume when it is the utterance already playing.
    pub fn request_playback(&mut self, request: &UtteranceRequest) -> PlaybackCommand {
        let text = clean_for_speech(&request.text);
        if text.is_empty() {
            debug!(correlation_id = %request.correlation_id, "nothing to speak after cleaning");
            return PlaybackCommand::Ignored;
        }

        let same_utterance = self
            .in_flight
            .as_ref()
            .is_some_and(|f| f.correlation_id == request.correlation_id);

        if same_utterance {
            return match self.state.status {
                PlaybackStatus::Speaking => {
                    self.engine.pause();
                    self.state.status = PlaybackStatus::Paused;
                    info!(correlation_id = %request.correlation_id, "⏸️ playback paused");
                    PlaybackCommand::Paused
                }
                PlaybackStatus::Paused => {
                    self.engine.resume();
                    self.state.status = PlaybackStatus::Speaking;
                    info!(correlation_id = %request.correlation_id, "▶️ playback resumed");
                    PlaybackCommand::Resumed
                }
                PlaybackStatus::Idle => {
                    debug!(correlation_id = %request.correlation_id, "utterance already starting");
                    PlaybackCommand::Ignored
                }
            };
        }

        if self.is_active() {
            self.engine.cancel();
            self.state = PlaybackState::idle();
            self.in_flight = None;
        }

        let language = self.detector.resolve(request.language_hint, &text);
        let locale = self.config.locale_for(language).to_string();
        let voice = self.catalog.select(&locale);
        if voice.is_none() {
            warn!(%locale, "no voice found; using engine default");
        }

        self.next_token += 1;
        let token = UtteranceToken(self.next_token);
        let utterance = Utterance {
            token,
            text,
            language_tag: voice.map(|v| v.language_tag.clone()).unwrap_or(locale),
            voice_name: voice.map(|v| v.display_name.clone()),
            rate: self.config.speech_rate,
            pitch: self.config.speech_pitch,
        };

        info!(
            correlation_id = %request.correlation_id,
            %token,
            language = %language,
            voice = utterance.voice_name.as_deref().unwrap_or("default"),
            "🔊 speaking"
        );
        self.in_flight = Some(InFlight {
            token,
            correlation_id: request.correlation_id.clone(),
        });
        self.engine.speak(&utterance);
        PlaybackCommand::Started(token)
    }

    /// Cancel whatever is playing or pending. Safe to call at any time.
    pub fn stop_playback(&mut self) {
        if !self.is_active() {
            return;
        }
        self.engine.cancel();
        self.in_flight = None;
        self.state = PlaybackState::idle();
        info!("🛑 playback stopped");
    }

    /// Apply an engine callback.
    pub fn handle_event(&mut self, event: &SynthesisEvent) {
        let Some(current) = self.in_flight.as_ref() else {
            debug!(token = %event.token, "synthesis event with nothing in flight; dropped");
            return;
        };
        if current.token != event.token {
            debug!(token = %event.token, current = %current.token, "stale synthesis event dropped");
            return;
        }

        match &event.kind {
            SynthesisEventKind::Started => {
                self.state = PlaybackState {
                    status: PlaybackStatus::Speaking,
                    active_correlation_id: Some(current.correlation_id.clone()),
                };
                self.last_error = None;
            }
            SynthesisEventKind::Paused => {
                if self.state.status == PlaybackStatus::Speaking {
                    self.state.status = PlaybackStatus::Paused;
                }
            }
            SynthesisEventKind::Resumed => {
                if self.state.status == PlaybackStatus::Paused {
                    self.state.status = PlaybackStatus::Speaking;
                }
            }
            SynthesisEventKind::Ended => {
                debug!(token = %event.token, "utterance finished");
                self.finish();
            }
            SynthesisEventKind::Failed(code) if code.is_cancellation() => {
                debug!(token = %event.token, code = code.as_str(), "utterance cancelled");
                self.finish();
            }
            SynthesisEventKind::Failed(code) => {
                warn!(token = %event.token, code = code.as_str(), "speech synthesis failed");
                self.last_error = Some(SpeechError::Synthesis(code.as_str().to_string()));
                self.finish();
            }
        }
    }

    /// Re-read the platform voice list.
    pub fn refresh_voices(&mut self) {
        let voices = self.engine.voices();
        self.catalog.refresh(&voices);
    }

    pub fn set_config(&mut self, config: SpeechConfig) {
        self.detector = ScriptDetector::new(config.detection_threshold);
        self.config = config;
    }

    fn finish(&mut self) {
        self.in_flight = None;
        self.state = PlaybackState::idle();
    }
}
