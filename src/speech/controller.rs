use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use super::{SpeechCapability, SpeechChannel, SpeechError, SpeechEvents};

/// Transitions kept for observability; older entries are dropped.
const MAX_TRANSITIONS: usize = 64;

/// Observable state change, recorded in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechTransition {
    ListeningStarted,
    ListeningStopped,
    SpeakingStarted,
    SpeakingStopped,
}

/// Snapshot for the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpeechStatus {
    pub listening: bool,
    pub speaking: bool,
    /// Finalized dictation since listening last started.
    pub transcript: String,
    /// Latest partial result, not yet final.
    pub interim: String,
}

#[derive(Default)]
struct SpeechState {
    status: SpeechStatus,
    transitions: Vec<SpeechTransition>,
}

impl SpeechState {
    fn record(&mut self, transition: SpeechTransition) {
        if self.transitions.len() == MAX_TRANSITIONS {
            self.transitions.remove(0);
        }
        self.transitions.push(transition);
    }

    fn set_listening(&mut self, on: bool) -> bool {
        if self.status.listening == on {
            return false;
        }
        self.status.listening = on;
        self.record(if on {
            SpeechTransition::ListeningStarted
        } else {
            SpeechTransition::ListeningStopped
        });
        true
    }

    fn set_speaking(&mut self, on: bool) -> bool {
        if self.status.speaking == on {
            return false;
        }
        self.status.speaking = on;
        self.record(if on {
            SpeechTransition::SpeakingStarted
        } else {
            SpeechTransition::SpeakingStopped
        });
        true
    }
}

/// Session-wide owner of the speech backend and its state.
///
/// Stop operations are idempotent: stopping a channel that is not running
/// does not reach the backend and leaves the state untouched.
pub struct SpeechController {
    backend: Arc<dyn SpeechCapability>,
    state: Mutex<SpeechState>,
}

impl SpeechController {
    pub fn new(backend: Arc<dyn SpeechCapability>) -> Self {
        Self {
            backend,
            state: Mutex::new(SpeechState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SpeechState> {
        // Plain flags and strings: recover from poisoning.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> SpeechStatus {
        self.lock().status.clone()
    }

    pub fn transitions(&self) -> Vec<SpeechTransition> {
        self.lock().transitions.clone()
    }

    pub fn is_listening(&self) -> bool {
        self.lock().status.listening
    }

    pub fn is_speaking(&self) -> bool {
        self.lock().status.speaking
    }

    // The lock is never held across a backend call: backends may fire
    // `SpeechEvents` synchronously from inside start/stop/speak.

    /// Start dictation. Returns whether listening is active afterwards.
    pub fn start_listening(&self) -> bool {
        if self.is_listening() {
            return true;
        }
        if let Err(e) = self.backend.start_listening() {
            tracing::warn!(error = %e, "Could not start speech recognition");
            return false;
        }
        let mut state = self.lock();
        state.status.transcript.clear();
        state.status.interim.clear();
        state.set_listening(true);
        true
    }

    /// Returns whether anything was stopped.
    pub fn stop_listening(&self) -> bool {
        if !self.is_listening() {
            return false;
        }
        self.backend.stop_listening();
        let mut state = self.lock();
        state.status.interim.clear();
        state.set_listening(false)
    }

    /// Read `text` aloud, cutting off anything already playing.
    /// Returns whether playback started.
    pub fn speak(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.stop_speaking();
        if let Err(e) = self.backend.speak(text) {
            tracing::warn!(error = %e, "Could not start speech synthesis");
            return false;
        }
        self.lock().set_speaking(true);
        true
    }

    /// Returns whether anything was stopped.
    pub fn stop_speaking(&self) -> bool {
        if !self.is_speaking() {
            return false;
        }
        self.backend.stop_speaking();
        self.lock().set_speaking(false)
    }

    /// Hand over the finalized dictation and reset it.
    pub fn take_transcript(&self) -> String {
        std::mem::take(&mut self.lock().status.transcript)
    }
}

impl SpeechEvents for SpeechController {
    fn on_partial_result(&self, transcript: &str) {
        let mut state = self.lock();
        if state.status.listening {
            state.status.interim = transcript.to_string();
        }
    }

    fn on_final_result(&self, transcript: &str) {
        let mut state = self.lock();
        // Late results after a stop are dropped.
        if !state.status.listening {
            return;
        }
        state.status.interim.clear();
        let piece = transcript.trim();
        if piece.is_empty() {
            return;
        }
        if !state.status.transcript.is_empty() {
            state.status.transcript.push(' ');
        }
        state.status.transcript.push_str(piece);
    }

    fn on_start(&self, channel: SpeechChannel) {
        let mut state = self.lock();
        match channel {
            SpeechChannel::Recognition => state.set_listening(true),
            SpeechChannel::Synthesis => state.set_speaking(true),
        };
    }

    fn on_end(&self, channel: SpeechChannel) {
        let mut state = self.lock();
        match channel {
            SpeechChannel::Recognition => {
                state.status.interim.clear();
                state.set_listening(false)
            }
            SpeechChannel::Synthesis => state.set_speaking(false),
        };
    }

    fn on_error(&self, channel: SpeechChannel, error: &SpeechError) {
        tracing::warn!(%channel, error = %error, "Speech backend reported an error");
        self.on_end(channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::mock::{MockSpeech, SpeechCall};
    use crate::speech::NullSpeech;

    fn controller() -> (Arc<MockSpeech>, SpeechController) {
        let backend = Arc::new(MockSpeech::new());
        let controller = SpeechController::new(backend.clone());
        (backend, controller)
    }

    #[test]
    fn start_and_stop_listening() {
        let (backend, speech) = controller();
        assert!(speech.start_listening());
        assert!(speech.is_listening());
        assert!(speech.stop_listening());
        assert!(!speech.is_listening());
        assert_eq!(
            backend.calls(),
            vec![SpeechCall::StartListening, SpeechCall::StopListening]
        );
    }

    #[test]
    fn stopping_when_stopped_is_a_no_op() {
        let (backend, speech) = controller();
        let before = speech.status();
        assert!(!speech.stop_listening());
        assert!(!speech.stop_speaking());
        assert_eq!(speech.status(), before);
        assert!(speech.transitions().is_empty());
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn double_stop_speaking_reaches_backend_once() {
        let (backend, speech) = controller();
        speech.speak("hello");
        assert!(speech.stop_speaking());
        assert!(!speech.stop_speaking());
        assert_eq!(
            backend.calls(),
            vec![SpeechCall::Speak("hello".into()), SpeechCall::StopSpeaking]
        );
    }

    #[test]
    fn speak_cuts_off_current_playback() {
        let (backend, speech) = controller();
        speech.speak("first");
        speech.speak("second");
        assert_eq!(
            backend.calls(),
            vec![
                SpeechCall::Speak("first".into()),
                SpeechCall::StopSpeaking,
                SpeechCall::Speak("second".into()),
            ]
        );
        assert_eq!(
            speech.transitions(),
            vec![
                SpeechTransition::SpeakingStarted,
                SpeechTransition::SpeakingStopped,
                SpeechTransition::SpeakingStarted,
            ]
        );
    }

    #[test]
    fn blank_text_is_not_spoken() {
        let (backend, speech) = controller();
        assert!(!speech.speak("   "));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn backend_failure_leaves_stopped_state() {
        let backend = Arc::new(MockSpeech::new().fail_listening(SpeechError::PermissionDenied));
        let speech = SpeechController::new(backend);
        assert!(!speech.start_listening());
        assert!(!speech.is_listening());
    }

    #[test]
    fn null_backend_cannot_speak() {
        let speech = SpeechController::new(Arc::new(NullSpeech));
        assert!(!speech.speak("hello"));
        assert!(!speech.start_listening());
        assert_eq!(speech.status(), SpeechStatus::default());
    }

    #[test]
    fn error_event_reduces_to_stopped() {
        let (_backend, speech) = controller();
        speech.start_listening();
        speech.on_error(SpeechChannel::Recognition, &SpeechError::Backend("no-speech".into()));
        assert!(!speech.is_listening());
        assert_eq!(
            speech.transitions(),
            vec![SpeechTransition::ListeningStarted, SpeechTransition::ListeningStopped]
        );
    }

    #[test]
    fn natural_end_of_playback_clears_speaking() {
        let (_backend, speech) = controller();
        speech.speak("hello");
        speech.on_end(SpeechChannel::Synthesis);
        assert!(!speech.is_speaking());
        // Already ended: stop is a no-op.
        assert!(!speech.stop_speaking());
    }

    #[test]
    fn transcripts_accumulate() {
        let (_backend, speech) = controller();
        speech.start_listening();
        speech.on_partial_result("how do");
        assert_eq!(speech.status().interim, "how do");
        speech.on_final_result("How do I focus");
        speech.on_final_result(" when studying? ");
        let status = speech.status();
        assert_eq!(status.interim, "");
        assert_eq!(status.transcript, "How do I focus when studying?");
        assert_eq!(speech.take_transcript(), "How do I focus when studying?");
        assert_eq!(speech.status().transcript, "");
    }

    #[test]
    fn restarting_listening_clears_old_transcript() {
        let (_backend, speech) = controller();
        speech.start_listening();
        speech.on_final_result("old question");
        speech.stop_listening();
        speech.start_listening();
        assert_eq!(speech.status().transcript, "");
    }

    #[test]
    fn final_result_after_stop_is_dropped() {
        let (_backend, speech) = controller();
        speech.start_listening();
        speech.stop_listening();
        speech.on_final_result("late words");
        assert_eq!(speech.status().transcript, "");
        assert_eq!(speech.take_transcript(), "");
    }

    #[test]
    fn partial_results_ignored_when_not_listening() {
        let (_backend, speech) = controller();
        speech.on_partial_result("stray");
        assert_eq!(speech.status().interim, "");
    }
}
