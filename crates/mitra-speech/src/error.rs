//! Error types for the Mitra speech subsystem

use crate::platform::RecognitionErrorCode;
use thiserror::Error;

/// Result type alias for speech operations
pub type SpeechResult<T> = Result<T, SpeechError>;

/// Errors surfaced by the speech controllers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpeechError {
    #[error("Speech recognition unsupported")]
    RecognitionUnsupported,

    #[error("Recognition error: {0}")]
    Recognition(RecognitionError),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Engine start failed: {0}")]
    EngineStart(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for SpeechError {
    fn from(err: config::ConfigError) -> Self {
        SpeechError::Config(err.to_string())
    }
}

impl From<RecognitionError> for SpeechError {
    fn from(err: RecognitionError) -> Self {
        match err {
            RecognitionError::Unsupported => SpeechError::RecognitionUnsupported,
            other => SpeechError::Recognition(other),
        }
    }
}

/// What went wrong with a transcription session, as seen by the UI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("recognition engine not present")]
    Unsupported,

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("no speech detected")]
    NoSpeechDetected,

    #[error("network failure")]
    NetworkFailure,

    #[error("recognition failed: {0}")]
    Other(String),
}

impl RecognitionError {
    /// Classify a platform error code. Returns `None` for codes that are
    /// swallowed entirely (our own aborts).
    pub fn from_code(code: &RecognitionErrorCode) -> Option<Self> {
        match code {
            RecognitionErrorCode::Aborted => None,
            RecognitionErrorCode::NoSpeech => Some(RecognitionError::NoSpeechDetected),
            RecognitionErrorCode::NotAllowed | RecognitionErrorCode::ServiceNotAllowed => {
                Some(RecognitionError::PermissionDenied)
            }
            RecognitionErrorCode::Network => Some(RecognitionError::NetworkFailure),
            other => Some(RecognitionError::Other(other.as_str().to_string())),
        }
    }

    /// Terminal errors end the session and are shown to the user.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RecognitionError::NoSpeechDetected)
    }

    /// Message suitable for a banner in the host UI.
    pub fn user_message(&self) -> String {
        match self {
            RecognitionError::Unsupported => {
                "Speech Recognition is not supported in this browser.".to_string()
            }
            RecognitionError::PermissionDenied => {
                "Permission denied. Please allow microphone access in your browser settings."
                    .to_string()
            }
            RecognitionError::NoSpeechDetected => "An error occurred: no-speech".to_string(),
            RecognitionError::NetworkFailure => "An error occurred: network".to_string(),
            RecognitionError::Other(code) => format!("An error occurred: {code}"),
        }
    }
}
