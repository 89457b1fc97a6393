//! Async driver: runs a [`SpeechCoordinator`] on one tokio task.
//!
//! Engine callbacks and user actions arrive as [`SpeechCommand`]s on one
//! channel, so they are applied strictly in arrival order. Between commands
//! the task sleeps until the coordinator's next timer deadline.

use crate::coordinator::{SpeechCoordinator, SpeechSnapshot};
use crate::language::Language;
use crate::output::UtteranceRequest;
use crate::platform::{RecognitionEvent, SynthesisEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// User actions and engine callbacks, applied in arrival order.
#[derive(Debug, Clone)]
pub enum SpeechCommand {
    StartListening,
    StopListening,
    RequestPlayback(UtteranceRequest),
    StopPlayback,
    SetLanguage(Language),
    Synthesis(SynthesisEvent),
    Recognition(RecognitionEvent),
    VoicesChanged,
    Shutdown,
}

/// Cloneable handle for sending commands and watching state.
#[derive(Debug, Clone)]
pub struct SpeechHandle {
    tx: mpsc::UnboundedSender<SpeechCommand>,
    snapshot: watch::Receiver<SpeechSnapshot>,
}

impl SpeechHandle {
    /// Returns false once the driver has stopped.
    pub fn send(&self, command: SpeechCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn start_listening(&self) -> bool {
        self.send(SpeechCommand::StartListening)
    }

    pub fn stop_listening(&self) -> bool {
        self.send(SpeechCommand::StopListening)
    }

    pub fn request_playback(&self, request: UtteranceRequest) -> bool {
        self.send(SpeechCommand::RequestPlayback(request))
    }

    pub fn stop_playback(&self) -> bool {
        self.send(SpeechCommand::StopPlayback)
    }

    pub fn snapshot(&self) -> SpeechSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SpeechSnapshot> {
        self.snapshot.clone()
    }
}

/// Spawn the driver task. Must be called from within a tokio runtime.
pub fn spawn_speech_driver(coordinator: SpeechCoordinator) -> (SpeechHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(coordinator.snapshot());
    let task = tokio::spawn(run_driver(coordinator, rx, snapshot_tx));
    (SpeechHandle { tx, snapshot: snapshot_rx }, task)
}

async fn run_driver(
    mut coordinator: SpeechCoordinator,
    mut rx: mpsc::UnboundedReceiver<SpeechCommand>,
    snapshot_tx: watch::Sender<SpeechSnapshot>,
) {
    info!("speech driver started");
    loop {
        let deadline = coordinator.next_deadline();
        tokio::select! {
            command = rx.recv() => {
                match command {
                    Some(SpeechCommand::Shutdown) | None => break,
                    Some(command) => apply(&mut coordinator, command),
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                debug!("speech timer fired");
            }
        }
        coordinator.poll_timers(Instant::now());
        snapshot_tx.send_replace(coordinator.snapshot());
    }
    coordinator.shutdown();
    snapshot_tx.send_replace(coordinator.snapshot());
    info!("speech driver stopped");
}

fn apply(coordinator: &mut SpeechCoordinator, command: SpeechCommand) {
    match command {
        SpeechCommand::StartListening => {
            if let Err(e) = coordinator.start_listening() {
                warn!(error = %e, "start listening failed");
            }
        }
        SpeechCommand::StopListening => coordinator.stop_listening(),
        SpeechCommand::RequestPlayback(request) => {
            coordinator.request_playback(&request);
        }
        SpeechCommand::StopPlayback => coordinator.stop_playback(),
        SpeechCommand::SetLanguage(language) => coordinator.set_language(language),
        SpeechCommand::Synthesis(event) => coordinator.handle_synthesis_event(&event),
        SpeechCommand::Recognition(event) => coordinator.handle_recognition_event(&event),
        SpeechCommand::VoicesChanged => coordinator.voices_changed(),
        SpeechCommand::Shutdown => {}
    }
}
