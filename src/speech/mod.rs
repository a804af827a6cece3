//! Speech Capability: speech-to-text for dictating questions and
//! text-to-speech for reading advice aloud.
//!
//! The platform backend implements `SpeechCapability` and reports what happens
//! through `SpeechEvents`. One `SpeechController` per session wraps the
//! backend, owns the listening/speaking state and is injected into the advisor.
//! Speech failures are logged and end in the stopped state; they never reach
//! a pipeline.

pub mod controller;
pub mod mock;

pub use controller::*;
pub use mock::*;

use serde::Serialize;
use thiserror::Error;

/// Which half of the speech subsystem an event or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechChannel {
    Recognition,
    Synthesis,
}

impl std::fmt::Display for SpeechChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recognition => write!(f, "speech recognition"),
            Self::Synthesis => write!(f, "speech synthesis"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpeechError {
    #[error("{0} is not available on this system")]
    Unsupported(SpeechChannel),

    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Speech backend error: {0}")]
    Backend(String),
}

/// Platform speech backend.
pub trait SpeechCapability: Send + Sync {
    fn start_listening(&self) -> Result<(), SpeechError>;

    fn stop_listening(&self);

    fn speak(&self, text: &str) -> Result<(), SpeechError>;

    fn stop_speaking(&self);
}

/// Callbacks a backend fires while listening or speaking.
pub trait SpeechEvents: Send + Sync {
    /// Interim transcript, replaced by the next partial or final result.
    fn on_partial_result(&self, transcript: &str);

    fn on_final_result(&self, transcript: &str);

    fn on_start(&self, channel: SpeechChannel);

    fn on_end(&self, channel: SpeechChannel);

    fn on_error(&self, channel: SpeechChannel, error: &SpeechError);
}
