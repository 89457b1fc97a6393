//! Driver tests on a paused tokio clock.

use mitra_speech::{
    spawn_speech_driver, FinalizeReason, LanguageHint, PlatformVoice, PlaybackStatus, RecognitionEvent,
    RecognitionEventKind, ResultFragment, ScriptedRecognition, ScriptedSynthesis, SpeechCommand, SpeechConfig,
    SpeechCoordinator, SynthesisCall, SynthesisEvent, SynthesisEventKind, UtteranceRequest,
};
use std::time::Duration;
use tokio::time::Instant;

fn setup() -> (
    mitra_speech::SpeechHandle,
    tokio::task::JoinHandle<()>,
    tokio::sync::mpsc::UnboundedReceiver<mitra_speech::FinalTranscript>,
    ScriptedSynthesis,
    ScriptedRecognition,
) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let synthesis = ScriptedSynthesis::default();
    let recognition = ScriptedRecognition::default();
    let (coordinator, transcripts) = SpeechCoordinator::new(
        Box::new(synthesis.clone()),
        Some(Box::new(recognition.clone())),
        SpeechConfig::default(),
    );
    let (handle, task) = spawn_speech_driver(coordinator);
    (handle, task, transcripts, synthesis, recognition)
}

#[tokio::test(start_paused = true)]
async fn inactivity_timer_submits_transcript() {
    let (handle, task, mut transcripts, _synthesis, recognition) = setup();
    let mut snapshots = handle.subscribe();

    handle.start_listening();
    snapshots.changed().await.unwrap();
    assert!(handle.snapshot().is_listening);
    let session = recognition.last_session().unwrap();

    handle.send(SpeechCommand::Recognition(RecognitionEvent {
        session,
        kind: RecognitionEventKind::Results(vec![ResultFragment::interim("PM K")]),
    }));
    snapshots.changed().await.unwrap();
    handle.send(SpeechCommand::Recognition(RecognitionEvent {
        session,
        kind: RecognitionEventKind::Results(vec![ResultFragment::final_text("PM Kisan scheme")]),
    }));
    snapshots.changed().await.unwrap();
    let last_speech = Instant::now();

    let transcript = transcripts.recv().await.unwrap();
    assert_eq!(transcript.text, "PM Kisan scheme");
    assert_eq!(transcript.reason, FinalizeReason::Inactivity);
    assert!(Instant::now() - last_speech >= Duration::from_millis(2500));

    handle.send(SpeechCommand::Shutdown);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unexpected_end_restarts_after_delay() {
    let (handle, task, _transcripts, _synthesis, recognition) = setup();
    let mut snapshots = handle.subscribe();

    handle.start_listening();
    snapshots.changed().await.unwrap();
    let session = recognition.last_session().unwrap();

    handle.send(SpeechCommand::Recognition(RecognitionEvent { session, kind: RecognitionEventKind::Ended }));
    snapshots.changed().await.unwrap();
    assert_eq!(recognition.starts().len(), 1);

    tokio::time::advance(Duration::from_millis(350)).await;
    snapshots.changed().await.unwrap();
    assert_eq!(recognition.starts().len(), 2);
    assert!(handle.snapshot().is_listening);

    handle.send(SpeechCommand::Shutdown);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn microphone_silences_playback() {
    let (handle, task, _transcripts, synthesis, _recognition) = setup();
    let mut snapshots = handle.subscribe();

    handle.request_playback(UtteranceRequest::new("Here is your answer: apply online.", "msg-1", LanguageHint::Auto));
    snapshots.changed().await.unwrap();
    let token = synthesis.last_spoken().unwrap().token;
    handle.send(SpeechCommand::Synthesis(SynthesisEvent { token, kind: SynthesisEventKind::Started }));
    snapshots.changed().await.unwrap();
    assert_eq!(handle.snapshot().playback.status, PlaybackStatus::Speaking);

    handle.start_listening();
    snapshots.changed().await.unwrap();
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.playback.status, PlaybackStatus::Idle);
    assert!(snapshot.is_listening);
    assert!(synthesis.calls().contains(&SynthesisCall::Cancel));

    handle.send(SpeechCommand::Shutdown);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn voices_changed_command_refreshes_selection() {
    let (handle, task, _transcripts, synthesis, _recognition) = setup();
    let mut snapshots = handle.subscribe();

    handle.request_playback(UtteranceRequest::new("Widow pension rules", "msg-1", LanguageHint::Secondary));
    snapshots.changed().await.unwrap();
    assert_eq!(synthesis.last_spoken().unwrap().voice_name, None);

    synthesis.set_voices(vec![PlatformVoice::new("Microsoft Kalpana - Hindi (India)", "hi-IN")]);
    handle.send(SpeechCommand::VoicesChanged);
    snapshots.changed().await.unwrap();

    handle.request_playback(UtteranceRequest::new("Widow pension rules", "msg-2", LanguageHint::Secondary));
    snapshots.changed().await.unwrap();
    assert_eq!(
        synthesis.last_spoken().unwrap().voice_name.as_deref(),
        Some("Microsoft Kalpana - Hindi (India)")
    );

    handle.send(SpeechCommand::Shutdown);
    task.await.unwrap();
}
