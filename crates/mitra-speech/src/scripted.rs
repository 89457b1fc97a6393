//! Scripted engines: record every call instead of producing audio.
//!
//! Clones share the same log, so a test keeps one handle and gives the other
//! to a controller. Events are never emitted on their own; the caller feeds
//! them back explicitly, which keeps ordering fully under test control.

use crate::error::{SpeechError, SpeechResult};
use crate::platform::{RecognitionEngine, RecognitionSettings, SessionToken, SynthesisEngine, Utterance};
use crate::voice::PlatformVoice;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisCall {
    Speak(Utterance),
    Cancel,
    Pause,
    Resume,
}

#[derive(Debug, Default)]
struct SynthesisLog {
    calls: Vec<SynthesisCall>,
    voices: Vec<PlatformVoice>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedSynthesis {
    inner: Arc<Mutex<SynthesisLog>>,
}

impl ScriptedSynthesis {
    pub fn with_voices(voices: Vec<PlatformVoice>) -> Self {
        let engine = Self::default();
        engine.set_voices(voices);
        engine
    }

    /// Replace the reported voice list (simulates a voices-changed signal).
    pub fn set_voices(&self, voices: Vec<PlatformVoice>) {
        lock(&self.inner).voices = voices;
    }

    pub fn calls(&self) -> Vec<SynthesisCall> {
        lock(&self.inner).calls.clone()
    }

    /// Utterances handed to `speak`, oldest first.
    pub fn spoken(&self) -> Vec<Utterance> {
        lock(&self.inner)
            .calls
            .iter()
            .filter_map(|c| match c {
                SynthesisCall::Speak(u) => Some(u.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_spoken(&self) -> Option<Utterance> {
        self.spoken().pop()
    }
}

impl SynthesisEngine for ScriptedSynthesis {
    fn speak(&mut self, utterance: &Utterance) {
        lock(&self.inner).calls.push(SynthesisCall::Speak(utterance.clone()));
    }

    fn cancel(&mut self) {
        lock(&self.inner).calls.push(SynthesisCall::Cancel);
    }

    fn pause(&mut self) {
        lock(&self.inner).calls.push(SynthesisCall::Pause);
    }

    fn resume(&mut self) {
        lock(&self.inner).calls.push(SynthesisCall::Resume);
    }

    fn voices(&self) -> Vec<PlatformVoice> {
        lock(&self.inner).voices.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionCall {
    Start(SessionToken, RecognitionSettings),
    Stop,
    Abort,
}

#[derive(Debug, Default)]
struct RecognitionLog {
    calls: Vec<RecognitionCall>,
    fail_next_start: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedRecognition {
    inner: Arc<Mutex<RecognitionLog>>,
}

impl ScriptedRecognition {
    pub fn calls(&self) -> Vec<RecognitionCall> {
        lock(&self.inner).calls.clone()
    }

    /// Sessions passed to `start`, oldest first.
    pub fn starts(&self) -> Vec<SessionToken> {
        lock(&self.inner)
            .calls
            .iter()
            .filter_map(|c| match c {
                RecognitionCall::Start(token, _) => Some(*token),
                _ => None,
            })
            .collect()
    }

    pub fn last_session(&self) -> Option<SessionToken> {
        self.starts().pop()
    }

    /// Make the next `start` call fail with `reason`.
    pub fn fail_next_start(&self, reason: impl Into<String>) {
        lock(&self.inner).fail_next_start = Some(reason.into());
    }
}

impl RecognitionEngine for ScriptedRecognition {
    fn start(&mut self, session: SessionToken, settings: &RecognitionSettings) -> SpeechResult<()> {
        let mut log = lock(&self.inner);
        if let Some(reason) = log.fail_next_start.take() {
            return Err(SpeechError::EngineStart(reason));
        }
        log.calls.push(RecognitionCall::Start(session, settings.clone()));
        Ok(())
    }

    fn stop(&mut self) {
        lock(&self.inner).calls.push(RecognitionCall::Stop);
    }

    fn abort(&mut self) {
        lock(&self.inner).calls.push(RecognitionCall::Abort);
    }
}
