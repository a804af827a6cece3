use std::sync::Mutex;

use super::{SpeechCapability, SpeechChannel, SpeechError};

/// Backend for systems without speech support.
pub struct NullSpeech;

impl SpeechCapability for NullSpeech {
    fn start_listening(&self) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported(SpeechChannel::Recognition))
    }

    fn stop_listening(&self) {}

    fn speak(&self, _text: &str) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported(SpeechChannel::Synthesis))
    }

    fn stop_speaking(&self) {}
}

/// One call received by `MockSpeech`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCall {
    StartListening,
    StopListening,
    Speak(String),
    StopSpeaking,
}

/// Mock speech backend for testing. Records every call in order.
#[derive(Default)]
pub struct MockSpeech {
    calls: Mutex<Vec<SpeechCall>>,
    listen_error: Option<SpeechError>,
    speak_error: Option<SpeechError>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_listening(mut self, error: SpeechError) -> Self {
        self.listen_error = Some(error);
        self
    }

    pub fn fail_speaking(mut self, error: SpeechError) -> Self {
        self.speak_error = Some(error);
        self
    }

    pub fn calls(&self) -> Vec<SpeechCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: SpeechCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl SpeechCapability for MockSpeech {
    fn start_listening(&self) -> Result<(), SpeechError> {
        self.record(SpeechCall::StartListening);
        match &self.listen_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn stop_listening(&self) {
        self.record(SpeechCall::StopListening);
    }

    fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.record(SpeechCall::Speak(text.to_string()));
        match &self.speak_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn stop_speaking(&self) {
        self.record(SpeechCall::StopSpeaking);
    }
}
