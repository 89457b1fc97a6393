//! **Speech Input Controller**: microphone transcription with inactivity auto-submit.
//!
//! State machine: `Idle → Listening → Idle`. While listening, final fragments
//! accumulate permanently and interim fragments are kept only for display.
//! Every burst of speech re-arms a single-shot inactivity timer; when it
//! expires the session is finalized and the accumulated text is sent on the
//! completion channel.
//!
//! Recognition engines end sessions on their own, especially in continuous
//! mode. When that happens while the user still wants to listen, one restart
//! is scheduled after a short delay. The restart budget is replenished only
//! by new speech, so an engine that keeps ending in silence is finalized
//! rather than restarted forever.

use crate::config::SpeechConfig;
use crate::error::{RecognitionError, SpeechError, SpeechResult};
use crate::language::Language;
use crate::platform::{
    RecognitionEngine, RecognitionErrorCode, RecognitionEvent, RecognitionEventKind, RecognitionSettings,
    ResultFragment, SessionToken,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Whether a transcription session is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListeningStatus {
    #[default]
    Idle,
    Listening,
}

/// Why a transcription session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalizeReason {
    /// The caller stopped listening.
    Stopped,
    /// No speech for the inactivity timeout.
    Inactivity,
    /// The engine ended and could not (or should not) be restarted.
    EngineEnded,
    /// A terminal recognition error.
    Error,
}

/// Text delivered to the caller once a session is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTranscript {
    pub text: String,
    pub language: Language,
    pub reason: FinalizeReason,
    pub completed_at: DateTime<Utc>,
}

/// One listen-until-stop capture. Spans engine restarts.
#[derive(Debug)]
struct TranscriptionSession {
    /// Token of the current engine run; events for older runs are dropped.
    engine_run: SessionToken,
    language: Language,
    language_tag: String,
    accumulated_final: String,
    latest_interim: String,
    last_activity: Instant,
    restart_available: bool,
}

/// Drives a [`RecognitionEngine`] through listen-until-stop sessions.
pub struct SpeechInputController {
    engine: Option<Box<dyn RecognitionEngine>>,
    config: SpeechConfig,
    session: Option<TranscriptionSession>,
    listening_intent: bool,
    starting: bool,
    inactivity_deadline: Option<Instant>,
    restart_deadline: Option<Instant>,
    error: Option<RecognitionError>,
    next_token: u64,
    completed_tx: mpsc::UnboundedSender<FinalTranscript>,
}

impl SpeechInputController {
    /// Create a controller. `None` means the platform has no recognition
    /// engine; the controller then reports `Unsupported` and never listens.
    pub fn new(
        engine: Option<Box<dyn RecognitionEngine>>,
        config: SpeechConfig,
    ) -> (Self, mpsc::UnboundedReceiver<FinalTranscript>) {
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        let error = if engine.is_none() {
            warn!("speech recognition is not supported in this environment");
            Some(RecognitionError::Unsupported)
        } else {
            None
        };

        let controller = Self {
            engine,
            config,
            session: None,
            listening_intent: false,
            starting: false,
            inactivity_deadline: None,
            restart_deadline: None,
            error,
            next_token: 0,
            completed_tx,
        };
        (controller, completed_rx)
    }

    pub fn status(&self) -> ListeningStatus {
        if self.session.is_some() {
            ListeningStatus::Listening
        } else {
            ListeningStatus::Idle
        }
    }

    pub fn is_listening(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_supported(&self) -> bool {
        self.engine.is_some()
    }

    pub fn error(&self) -> Option<&RecognitionError> {
        self.error.as_ref()
    }

    pub fn language(&self) -> Language {
        self.config.language
    }

    /// Accumulated final text followed by the latest interim guess.
    pub fn transcript(&self) -> String {
        let Some(session) = self.session.as_ref() else {
            return String::new();
        };
        let mut text = session.accumulated_final.clone();
        append_fragment(&mut text, &session.latest_interim);
        text
    }

    /// When the last speech arrived in the current session.
    pub fn last_activity(&self) -> Option<Instant> {
        self.session.as_ref().map(|s| s.last_activity)
    }

    /// Earliest armed timer, if any. The host should call
    /// [`poll_timers`](Self::poll_timers) once it passes.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.inactivity_deadline, self.restart_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Begin a new transcription session. A no-op while already listening or starting.
    pub fn start_listening(&mut self) -> SpeechResult<()> {
        if self.engine.is_none() {
            return Err(SpeechError::RecognitionUnsupported);
        }
        if self.session.is_some() || self.starting {
            debug!("start_listening ignored: session already active");
            return Ok(());
        }

        self.error = None;
        let language = self.config.language;
        let language_tag = self.config.locale_for(language).to_string();
        let token = self.next_session_token();

        self.starting = true;
        if let Err(e) = self.engine_start(token, &language_tag) {
            warn!(session = %token, error = %e, "recognition engine failed to start");
            self.starting = false;
            self.listening_intent = false;
            self.error = Some(RecognitionError::Other(e.to_string()));
            return Err(e);
        }

        let now = Instant::now();
        self.listening_intent = true;
        self.session = Some(TranscriptionSession {
            engine_run: token,
            language,
            language_tag,
            accumulated_final: String::new(),
            latest_interim: String::new(),
            last_activity: now,
            restart_available: true,
        });
        self.restart_deadline = None;
        self.inactivity_deadline = Some(now + self.config.inactivity_timeout());
        info!(session = %token, language = %language, "🎤 listening");
        Ok(())
    }

    /// End the session and deliver whatever final text was heard. Idempotent.
    pub fn stop_listening(&mut self) {
        if self.session.is_none() {
            return;
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.stop();
        }
        self.finalize(FinalizeReason::Stopped);
    }

    /// Change the recognition language. An active session keeps its language.
    pub fn set_language(&mut self, language: Language) {
        if self.config.language != language {
            debug!(language = %language, "recognition language updated");
        }
        self.config.language = language;
    }

    pub fn set_config(&mut self, config: SpeechConfig) {
        self.config = config;
    }

    /// Apply an engine callback.
    pub fn handle_event(&mut self, event: &RecognitionEvent) {
        let Some(session) = self.session.as_mut() else {
            debug!(session = %event.session, "recognition event with no active session; dropped");
            return;
        };
        if session.engine_run != event.session {
            debug!(session = %event.session, current = %session.engine_run, "stale recognition event dropped");
            return;
        }

        match &event.kind {
            RecognitionEventKind::Started => {
                self.starting = false;
            }
            RecognitionEventKind::Results(fragments) => {
                self.starting = false;
                if absorb_results(session, fragments) {
                    let now = Instant::now();
                    session.last_activity = now;
                    session.restart_available = true;
                    self.inactivity_deadline = Some(now + self.config.inactivity_timeout());
                }
            }
            RecognitionEventKind::Ended => {
                self.starting = false;
                self.handle_engine_end();
            }
            RecognitionEventKind::Failed(code) => self.handle_engine_error(code),
        }
    }

    /// Fire any timers due at `now`.
    pub fn poll_timers(&mut self, now: Instant) {
        if self.inactivity_deadline.is_some_and(|d| now >= d) {
            info!("⏱️ no speech for {:?}; submitting transcript", self.config.inactivity_timeout());
            if let Some(engine) = self.engine.as_mut() {
                engine.stop();
            }
            self.finalize(FinalizeReason::Inactivity);
            return;
        }
        if self.restart_deadline.is_some_and(|d| now >= d) {
            self.restart_deadline = None;
            self.restart_engine();
        }
    }

    /// Drop the session without delivering it. Used on teardown.
    pub fn shutdown(&mut self) {
        if self.session.take().is_some() {
            if let Some(engine) = self.engine.as_mut() {
                engine.abort();
            }
        }
        self.listening_intent = false;
        self.starting = false;
        self.inactivity_deadline = None;
        self.restart_deadline = None;
    }

    fn handle_engine_end(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if self.listening_intent && session.restart_available {
            session.restart_available = false;
            session.latest_interim.clear();
            let delay = self.config.restart_delay();
            self.restart_deadline = Some(Instant::now() + delay);
            info!(session = %session.engine_run, ?delay, "engine ended on its own; scheduling restart");
        } else {
            info!(session = %session.engine_run, "engine ended; finalizing session");
            self.finalize(FinalizeReason::EngineEnded);
        }
    }

    fn handle_engine_error(&mut self, code: &RecognitionErrorCode) {
        match RecognitionError::from_code(code) {
            None => debug!(code = code.as_str(), "recognition aborted by us; ignored"),
            Some(err) if !err.is_terminal() => {
                debug!(code = code.as_str(), "non-terminal recognition error swallowed");
            }
            Some(err) => {
                warn!(code = code.as_str(), "speech recognition error");
                self.error = Some(err);
                if let Some(engine) = self.engine.as_mut() {
                    engine.abort();
                }
                self.finalize(FinalizeReason::Error);
            }
        }
    }

    fn restart_engine(&mut self) {
        if !self.listening_intent {
            return;
        }
        let Some(language_tag) = self.session.as_ref().map(|s| s.language_tag.clone()) else {
            return;
        };
        let token = self.next_session_token();
        self.starting = true;
        match self.engine_start(token, &language_tag) {
            Ok(()) => {
                if let Some(session) = self.session.as_mut() {
                    session.engine_run = token;
                    session.latest_interim.clear();
                }
                info!(session = %token, "🔁 recognition restarted");
            }
            Err(e) => {
                warn!(session = %token, error = %e, "failed to restart speech recognition");
                self.finalize(FinalizeReason::EngineEnded);
            }
        }
    }

    fn engine_start(&mut self, token: SessionToken, language_tag: &str) -> SpeechResult<()> {
        let settings = RecognitionSettings {
            language_tag: language_tag.to_string(),
            continuous: self.config.continuous,
            interim_results: self.config.interim_results,
        };
        match self.engine.as_mut() {
            Some(engine) => engine.start(token, &settings),
            None => Err(SpeechError::RecognitionUnsupported),
        }
    }

    fn next_session_token(&mut self) -> SessionToken {
        self.next_token += 1;
        SessionToken(self.next_token)
    }

    /// End the session and deliver non-empty final text exactly once.
    fn finalize(&mut self, reason: FinalizeReason) {
        self.listening_intent = false;
        self.starting = false;
        self.inactivity_deadline = None;
        self.restart_deadline = None;

        let Some(session) = self.session.take() else {
            return;
        };
        let text = session.accumulated_final.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            info!(?reason, "listening ended with nothing to submit");
            return;
        }

        info!(?reason, chars = text.chars().count(), "✅ transcript finalized");
        let transcript = FinalTranscript {
            text,
            language: session.language,
            reason,
            completed_at: Utc::now(),
        };
        if self.completed_tx.send(transcript).is_err() {
            warn!("transcript receiver dropped; final transcript discarded");
        }
    }
}

/// Fold one result event into the session. Returns true when it carried speech.
fn absorb_results(session: &mut TranscriptionSession, fragments: &[ResultFragment]) -> bool {
    let mut heard = false;
    let mut interim = String::new();
    for fragment in fragments {
        if fragment.is_final {
            if !fragment.text.trim().is_empty() {
                append_fragment(&mut session.accumulated_final, &fragment.text);
                heard = true;
            }
        } else {
            append_fragment(&mut interim, &fragment.text);
        }
    }
    if !interim.is_empty() {
        heard = true;
    }
    session.latest_interim = interim;
    heard
}

fn append_fragment(text: &mut String, fragment: &str) {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return;
    }
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(fragment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{RecognitionCall, ScriptedRecognition};
    use std::time::Duration;

    fn controller() -> (SpeechInputController, mpsc::UnboundedReceiver<FinalTranscript>, ScriptedRecognition) {
        let engine = ScriptedRecognition::default();
        let (controller, rx) = SpeechInputController::new(Some(Box::new(engine.clone())), SpeechConfig::default());
        (controller, rx, engine)
    }

    fn event(engine: &ScriptedRecognition, kind: RecognitionEventKind) -> RecognitionEvent {
        RecognitionEvent { session: engine.last_session().unwrap(), kind }
    }

    fn later(secs: u64) -> Instant {
        Instant::now() + Duration::from_secs(secs)
    }

    #[test]
    fn unsupported_engine_reports_once_and_never_listens() {
        let (mut controller, _rx) = SpeechInputController::new(None, SpeechConfig::default());
        assert_eq!(controller.error(), Some(&RecognitionError::Unsupported));
        assert_eq!(controller.start_listening(), Err(SpeechError::RecognitionUnsupported));
        assert!(!controller.is_listening());
    }

    #[test]
    fn double_start_hits_engine_once() {
        let (mut controller, _rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.start_listening().unwrap();
        assert_eq!(engine.starts().len(), 1);
        assert_eq!(controller.status(), ListeningStatus::Listening);
    }

    #[test]
    fn start_uses_configured_locale_and_continuous_mode() {
        let (mut controller, _rx, engine) = controller();
        controller.set_language(Language::Hindi);
        controller.start_listening().unwrap();
        let calls = engine.calls();
        let RecognitionCall::Start(_, settings) = &calls[0] else {
            panic!("expected start call");
        };
        assert_eq!(settings.language_tag, "hi-IN");
        assert!(settings.continuous && settings.interim_results);
    }

    #[test]
    fn interim_replaces_and_final_accumulates() {
        let (mut controller, _rx, engine) = controller();
        controller.start_listening().unwrap();

        controller.handle_event(&event(&engine, RecognitionEventKind::Results(vec![ResultFragment::interim("PM")])));
        controller.handle_event(&event(&engine, RecognitionEventKind::Results(vec![ResultFragment::interim("PM K")])));
        assert_eq!(controller.transcript(), "PM K");

        controller.handle_event(&event(
            &engine,
            RecognitionEventKind::Results(vec![ResultFragment::final_text("PM Kisan scheme")]),
        ));
        controller.handle_event(&event(&engine, RecognitionEventKind::Results(vec![ResultFragment::interim("for")])));
        assert_eq!(controller.transcript(), "PM Kisan scheme for");
    }

    #[test]
    fn inactivity_delivers_final_text_once() {
        let (mut controller, mut rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.handle_event(&event(&engine, RecognitionEventKind::Results(vec![ResultFragment::interim("PM K")])));
        controller.handle_event(&event(
            &engine,
            RecognitionEventKind::Results(vec![ResultFragment::final_text("PM Kisan scheme")]),
        ));

        controller.poll_timers(later(1));
        assert!(controller.is_listening());

        controller.poll_timers(later(3));
        assert!(!controller.is_listening());
        let transcript = rx.try_recv().unwrap();
        assert_eq!(transcript.text, "PM Kisan scheme");
        assert_eq!(transcript.reason, FinalizeReason::Inactivity);

        controller.poll_timers(later(10));
        controller.stop_listening();
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.calls().last(), Some(&RecognitionCall::Stop));
    }

    #[test]
    fn stop_delivers_pending_text_and_is_idempotent() {
        let (mut controller, mut rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.handle_event(&event(
            &engine,
            RecognitionEventKind::Results(vec![ResultFragment::final_text("scholarship for girls")]),
        ));
        controller.stop_listening();
        controller.stop_listening();

        assert_eq!(rx.try_recv().unwrap().reason, FinalizeReason::Stopped);
        assert!(rx.try_recv().is_err());
        assert_eq!(controller.next_deadline(), None);
    }

    #[test]
    fn interim_only_text_is_not_submitted() {
        let (mut controller, mut rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.handle_event(&event(&engine, RecognitionEventKind::Results(vec![ResultFragment::interim("um")])));
        controller.stop_listening();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn no_speech_error_is_swallowed_and_end_restarts_once() {
        let (mut controller, mut rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.handle_event(&event(&engine, RecognitionEventKind::Failed(RecognitionErrorCode::NoSpeech)));
        assert!(controller.error().is_none());

        controller.handle_event(&event(&engine, RecognitionEventKind::Ended));
        assert!(controller.is_listening());
        controller.poll_timers(Instant::now() + Duration::from_millis(400));
        assert_eq!(engine.starts().len(), 2);

        // second end with no speech in between finalizes instead of looping
        controller.handle_event(&event(&engine, RecognitionEventKind::Ended));
        assert!(!controller.is_listening());
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.starts().len(), 2);
    }

    #[test]
    fn speech_after_restart_replenishes_budget() {
        let (mut controller, _rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.handle_event(&event(&engine, RecognitionEventKind::Ended));
        controller.poll_timers(Instant::now() + Duration::from_millis(400));
        controller.handle_event(&event(
            &engine,
            RecognitionEventKind::Results(vec![ResultFragment::final_text("hello")]),
        ));
        controller.handle_event(&event(&engine, RecognitionEventKind::Ended));
        assert!(controller.is_listening());
        assert!(controller.next_deadline().is_some());
    }

    #[test]
    fn late_events_from_old_run_are_ignored() {
        let (mut controller, _rx, engine) = controller();
        controller.start_listening().unwrap();
        let first = engine.last_session().unwrap();
        controller.handle_event(&event(&engine, RecognitionEventKind::Ended));
        controller.poll_timers(Instant::now() + Duration::from_millis(400));

        controller.handle_event(&RecognitionEvent {
            session: first,
            kind: RecognitionEventKind::Results(vec![ResultFragment::final_text("ghost")]),
        });
        assert_eq!(controller.transcript(), "");
    }

    #[test]
    fn end_after_stop_does_not_restart() {
        let (mut controller, _rx, engine) = controller();
        controller.start_listening().unwrap();
        let session = engine.last_session().unwrap();
        controller.stop_listening();

        controller.handle_event(&RecognitionEvent { session, kind: RecognitionEventKind::Ended });
        controller.poll_timers(later(5));
        assert!(!controller.is_listening());
        assert_eq!(controller.next_deadline(), None);
        assert_eq!(engine.starts().len(), 1);
    }

    #[test]
    fn end_after_inactivity_finalize_does_not_restart() {
        let (mut controller, mut rx, engine) = controller();
        controller.start_listening().unwrap();
        let session = engine.last_session().unwrap();
        controller.handle_event(&event(
            &engine,
            RecognitionEventKind::Results(vec![ResultFragment::final_text("kisan credit card")]),
        ));
        controller.poll_timers(later(3));
        assert_eq!(rx.try_recv().unwrap().reason, FinalizeReason::Inactivity);

        controller.handle_event(&RecognitionEvent { session, kind: RecognitionEventKind::Ended });
        controller.poll_timers(later(10));
        assert!(!controller.is_listening());
        assert_eq!(engine.starts().len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn aborted_error_is_swallowed_and_listening_continues() {
        let (mut controller, mut rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.handle_event(&event(&engine, RecognitionEventKind::Failed(RecognitionErrorCode::Aborted)));

        assert!(controller.is_listening());
        assert!(controller.error().is_none());
        assert!(rx.try_recv().is_err());
        assert!(!engine.calls().contains(&RecognitionCall::Abort));

        controller.handle_event(&event(
            &engine,
            RecognitionEventKind::Results(vec![ResultFragment::final_text("still here")]),
        ));
        assert_eq!(controller.transcript(), "still here");
    }

    #[test]
    fn permission_denied_is_terminal_and_visible() {
        let (mut controller, _rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.handle_event(&event(&engine, RecognitionEventKind::Failed(RecognitionErrorCode::NotAllowed)));

        assert!(!controller.is_listening());
        assert_eq!(controller.error(), Some(&RecognitionError::PermissionDenied));
        // the trailing end event must not trigger a restart
        controller.handle_event(&RecognitionEvent { session: SessionToken(1), kind: RecognitionEventKind::Ended });
        controller.poll_timers(later(5));
        assert_eq!(engine.starts().len(), 1);
    }

    #[test]
    fn network_error_submits_what_was_heard() {
        let (mut controller, mut rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.handle_event(&event(
            &engine,
            RecognitionEventKind::Results(vec![ResultFragment::final_text("ration card")]),
        ));
        controller.handle_event(&event(&engine, RecognitionEventKind::Failed(RecognitionErrorCode::Network)));

        assert_eq!(controller.error(), Some(&RecognitionError::NetworkFailure));
        let transcript = rx.try_recv().unwrap();
        assert_eq!((transcript.text.as_str(), transcript.reason), ("ration card", FinalizeReason::Error));
    }

    #[test]
    fn failed_restart_ends_session() {
        let (mut controller, mut rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.handle_event(&event(
            &engine,
            RecognitionEventKind::Results(vec![ResultFragment::final_text("widow pension")]),
        ));
        controller.handle_event(&event(&engine, RecognitionEventKind::Ended));
        engine.fail_next_start("InvalidStateError");
        controller.poll_timers(Instant::now() + Duration::from_millis(400));

        assert!(!controller.is_listening());
        assert_eq!(rx.try_recv().unwrap().reason, FinalizeReason::EngineEnded);
    }

    #[test]
    fn language_switch_does_not_touch_active_session() {
        let (mut controller, _rx, engine) = controller();
        controller.start_listening().unwrap();
        controller.set_language(Language::Hindi);
        controller.handle_event(&event(&engine, RecognitionEventKind::Ended));
        controller.poll_timers(Instant::now() + Duration::from_millis(400));

        let tags: Vec<String> = engine
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                RecognitionCall::Start(_, s) => Some(s.language_tag),
                _ => None,
            })
            .collect();
        assert_eq!(tags, vec!["en-IN".to_string(), "en-IN".to_string()]);
        assert_eq!(controller.language(), Language::Hindi);
    }

    #[test]
    fn engine_start_failure_is_reported() {
        let (mut controller, _rx, engine) = controller();
        engine.fail_next_start("busy");
        assert!(controller.start_listening().is_err());
        assert!(!controller.is_listening());
        assert!(matches!(controller.error(), Some(RecognitionError::Other(_))));
        controller.start_listening().unwrap();
        assert!(controller.is_listening());
    }
}
