//! Mitra Speech preview
//!
//! Reads chat replies from stdin, one per line, and runs each through the
//! playback pipeline. Instead of audio, every utterance the synthesis engine
//! would receive is printed as a JSON line, so cleaning, language detection
//! and voice choice can be checked from a terminal.
//!
//! | Flag / env                        | Meaning                                  |
//! |-----------------------------------|------------------------------------------|
//! | `--voices <file>` / `MITRA_VOICES_FILE` | JSON array of `{name, lang, is_default}` |
//! | `--lang auto\|primary\|secondary` | Language hint for every line             |

use mitra_speech::{
    spawn_speech_driver, LanguageHint, PlatformVoice, SpeechCommand, SpeechConfig, SpeechCoordinator,
    SynthesisEngine, SynthesisEvent, SynthesisEventKind, Utterance, UtteranceRequest,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Prints utterances instead of speaking them and reports each as played.
struct PreviewSynthesis {
    voices: Vec<PlatformVoice>,
    events: mpsc::UnboundedSender<SynthesisEvent>,
}

impl PreviewSynthesis {
    fn emit(&self, utterance: &Utterance, kind: SynthesisEventKind) {
        if self.events.send(SynthesisEvent { token: utterance.token, kind }).is_err() {
            tracing::debug!(token = %utterance.token, "speech driver gone; synthesis event dropped");
        }
    }
}

impl SynthesisEngine for PreviewSynthesis {
    fn speak(&mut self, utterance: &Utterance) {
        match serde_json::to_string(utterance) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "could not encode utterance"),
        }
        self.emit(utterance, SynthesisEventKind::Started);
        self.emit(utterance, SynthesisEventKind::Ended);
    }

    fn cancel(&mut self) {}

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn voices(&self) -> Vec<PlatformVoice> {
        self.voices.clone()
    }
}

#[derive(Debug, Default)]
struct Args {
    voices_file: Option<PathBuf>,
    hint: LanguageHint,
}

fn parse_args() -> Result<Args, BoxError> {
    let mut args = Args {
        voices_file: std::env::var("MITRA_VOICES_FILE").ok().map(PathBuf::from),
        ..Args::default()
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--voices" => {
                let path = it.next().ok_or("--voices needs a file path")?;
                args.voices_file = Some(PathBuf::from(path));
            }
            "--lang" => {
                let value = it.next().ok_or("--lang needs auto, primary or secondary")?;
                args.hint = value.parse()?;
            }
            other => return Err(format!("unknown argument: {other}").into()),
        }
    }
    Ok(args)
}

fn builtin_voices() -> Vec<PlatformVoice> {
    vec![
        PlatformVoice::new("Microsoft Heera - English (India)", "en-IN"),
        PlatformVoice::new("Google हिन्दी", "hi-IN"),
        PlatformVoice::new("Microsoft Kalpana - Hindi (India)", "hi-IN"),
        PlatformVoice::new("Microsoft David - English (United States)", "en-US").as_default(),
    ]
}

fn load_voices(path: Option<&PathBuf>) -> Result<Vec<PlatformVoice>, BoxError> {
    let Some(path) = path else {
        return Ok(builtin_voices());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read voices file {}: {e}", path.display()))?;
    let voices: Vec<PlatformVoice> = serde_json::from_str(&raw)?;
    tracing::info!(count = voices.len(), path = %path.display(), "voices loaded");
    Ok(voices)
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[mitra-speech-preview] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = parse_args()?;
    let config = SpeechConfig::load()?;
    let voices = load_voices(args.voices_file.as_ref())?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let synthesis = PreviewSynthesis { voices, events: events_tx };
    let (coordinator, _transcripts) = SpeechCoordinator::new(Box::new(synthesis), None, config);
    let (handle, driver) = spawn_speech_driver(coordinator);

    let forward = handle.clone();
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            if !forward.send(SpeechCommand::Synthesis(event)) {
                break;
            }
        }
    });

    tracing::info!(hint = ?args.hint, "speech preview ready; one reply per line");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut count = 0u64;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(text) => {
                        count += 1;
                        let request = UtteranceRequest::new(text, format!("line-{count}"), args.hint);
                        handle.request_playback(request);
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down preview");
                break;
            }
        }
    }

    handle.send(SpeechCommand::Shutdown);
    driver.await?;
    Ok(())
}
