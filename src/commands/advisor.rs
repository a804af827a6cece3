//! Commands for the study advisor: query submission, the advice view and
//! speech input/output.

use std::sync::Arc;

use serde::Serialize;

use crate::core_state::CoreState;
use crate::in_flight::OperationKind;
use crate::pipeline::advice::{is_submittable, request_advice, AdviceResponse};
use crate::speech::SpeechStatus;

const KIND: OperationKind = OperationKind::AdviceRequest;

/// What happened to a submitted query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum AdviceSubmission {
    /// Blank query, or a request already in flight. Nothing changed.
    Ignored,
    Published(AdviceResponse),
    /// Display string of the failure, also stored as the advisor error.
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct AdvisorSnapshot {
    pub draft: String,
    pub advice: Option<AdviceResponse>,
    pub error: Option<String>,
    pub is_loading: bool,
    pub can_submit: bool,
    pub speech: SpeechStatus,
}

/// Submit a question.
///
/// Order: stop any playback, clear the previous advice and error, then send
/// the query. A blank query or one sent while another is in flight is ignored
/// and leaves the advisor untouched.
pub async fn submit_query(
    state: &Arc<CoreState>,
    query: String,
) -> Result<AdviceSubmission, String> {
    if !is_submittable(&query) {
        return Ok(AdviceSubmission::Ignored);
    }
    let Some(_guard) = state.gate(KIND).try_acquire(KIND) else {
        tracing::debug!("Advice request already in flight, ignoring submit");
        return Ok(AdviceSubmission::Ignored);
    };

    state.speech().stop_speaking();
    {
        let mut advisor = state.advisor().map_err(|e| e.to_string())?;
        advisor.advice = None;
        advisor.error = None;
    }

    let model = state.model();
    let outcome = tokio::task::spawn_blocking(move || request_advice(model.as_ref(), &query))
        .await
        .map_err(|e| format!("Task failed: {e}"))?;

    let mut advisor = state.advisor().map_err(|e| e.to_string())?;
    match outcome {
        Ok(advice) => {
            advisor.advice = Some(advice.clone());
            Ok(AdviceSubmission::Published(advice))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Advice request failed");
            let message = e.to_string();
            advisor.error = Some(message.clone());
            Ok(AdviceSubmission::Failed(message))
        }
    }
}

/// Keep the composed query in sync with the input box.
pub fn update_draft(state: &CoreState, text: String) -> Result<(), String> {
    state.advisor().map_err(|e| e.to_string())?.draft = text;
    Ok(())
}

pub fn advisor_snapshot(state: &CoreState) -> Result<AdvisorSnapshot, String> {
    let is_loading = state.is_busy(KIND);
    let advisor = state.advisor().map_err(|e| e.to_string())?;
    Ok(AdvisorSnapshot {
        draft: advisor.draft.clone(),
        advice: advisor.advice.clone(),
        error: advisor.error.clone(),
        is_loading,
        can_submit: !is_loading && is_submittable(&advisor.draft),
        speech: state.speech().status(),
    })
}

/// Read the current advice aloud. Returns whether playback started.
pub fn speak_advice(state: &CoreState) -> Result<bool, String> {
    let text = match state.advisor().map_err(|e| e.to_string())?.advice.as_ref() {
        Some(advice) => advice.speech_text(),
        None => return Ok(false),
    };
    Ok(state.speech().speak(&text))
}

pub fn stop_speaking(state: &CoreState) -> bool {
    state.speech().stop_speaking()
}

/// Start dictation into the draft.
pub fn start_listening(state: &CoreState) -> bool {
    state.speech().start_listening()
}

/// Stop dictation and append what was heard to the draft. Returns the draft.
pub fn stop_listening(state: &CoreState) -> Result<String, String> {
    let speech = state.speech();
    speech.stop_listening();
    let heard = speech.take_transcript();

    let mut advisor = state.advisor().map_err(|e| e.to_string())?;
    if !heard.is_empty() {
        if !advisor.draft.trim().is_empty() {
            advisor.draft.push(' ');
        }
        advisor.draft.push_str(&heard);
    }
    Ok(advisor.draft.clone())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::pipeline::model::{
        parse_model_output, MockModelClient, ModelClient, ModelError, ModelRequest,
    };
    use crate::preferences::PreferenceStore;
    use crate::speech::{MockSpeech, SpeechCall, SpeechEvents, SpeechTransition};

    const ADVICE_JSON: &str = r#"{
        "title": "Beat exam stress",
        "introduction": "Here is a plan.",
        "sections": [
            {"heading": "Plan", "icon": "plan", "points": [{"subheading": "Week one", "description": "Review algebra."}]}
        ],
        "conclusion": "You can do it."
    }"#;

    const OTHER_JSON: &str = r#"{
        "title": "Focus better",
        "introduction": "Try this.",
        "sections": [],
        "conclusion": "Good luck"
    }"#;

    fn state_with(
        client: Arc<dyn ModelClient>,
        speech: Arc<MockSpeech>,
    ) -> (tempfile::TempDir, Arc<CoreState>) {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(CoreState::new(
            client,
            speech,
            PreferenceStore::in_dir(dir.path()),
        ));
        (dir, state)
    }

    /// Records the speech backend's call log at the moment the model is called.
    struct SpeechRecordingClient {
        speech: Arc<MockSpeech>,
        seen: Mutex<Vec<Vec<SpeechCall>>>,
    }

    impl ModelClient for SpeechRecordingClient {
        fn generate(&self, request: &ModelRequest) -> Result<serde_json::Value, ModelError> {
            self.seen.lock().unwrap().push(self.speech.calls());
            parse_model_output(ADVICE_JSON, &request.schema)
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn publishes_advice() {
        let client = Arc::new(MockModelClient::new(ADVICE_JSON));
        let (_dir, state) = state_with(client.clone(), Arc::new(MockSpeech::new()));

        let outcome = submit_query(&state, "I panic before exams".into()).await.unwrap();
        let AdviceSubmission::Published(advice) = outcome else {
            panic!("expected published advice");
        };
        assert_eq!(advice.title, "Beat exam stress");

        let snap = advisor_snapshot(&state).unwrap();
        assert_eq!(snap.advice, Some(advice));
        assert!(snap.error.is_none());
        assert!(!snap.is_loading);
        assert_eq!(client.calls()[0].prompt, "I panic before exams");
    }

    #[tokio::test]
    async fn blank_query_leaves_previous_advice() {
        let client = Arc::new(MockModelClient::new(ADVICE_JSON));
        let (_dir, state) = state_with(client.clone(), Arc::new(MockSpeech::new()));
        submit_query(&state, "first".into()).await.unwrap();

        let outcome = submit_query(&state, "   \n".into()).await.unwrap();
        assert_eq!(outcome, AdviceSubmission::Ignored);
        assert_eq!(client.call_count(), 1);
        assert!(advisor_snapshot(&state).unwrap().advice.is_some());
    }

    #[tokio::test]
    async fn submit_while_in_flight_is_ignored() {
        let client = Arc::new(MockModelClient::new(ADVICE_JSON));
        let (_dir, state) = state_with(client.clone(), Arc::new(MockSpeech::new()));

        let _held = state.gate(KIND).try_acquire(KIND).unwrap();
        let outcome = submit_query(&state, "second".into()).await.unwrap();
        assert_eq!(outcome, AdviceSubmission::Ignored);
        assert_eq!(client.call_count(), 0);
        assert!(advisor_snapshot(&state).unwrap().is_loading);
    }

    #[tokio::test]
    async fn failure_replaces_previous_advice_with_error() {
        let client = Arc::new(
            MockModelClient::failing(ModelError::Api {
                status: 429,
                message: "quota exceeded".into(),
            })
            .then(ADVICE_JSON),
        );
        let (_dir, state) = state_with(client, Arc::new(MockSpeech::new()));
        submit_query(&state, "first".into()).await.unwrap();

        let outcome = submit_query(&state, "second".into()).await.unwrap();
        assert_eq!(
            outcome,
            AdviceSubmission::Failed("quota exceeded".into())
        );
        let snap = advisor_snapshot(&state).unwrap();
        assert!(snap.advice.is_none());
        assert_eq!(snap.error.as_deref(), Some("quota exceeded"));
    }

    #[tokio::test]
    async fn success_replaces_error_and_old_advice() {
        let client = Arc::new(
            MockModelClient::new(OTHER_JSON)
                .then(ADVICE_JSON)
                .then_fail(ModelError::Transport("offline".into())),
        );
        let (_dir, state) = state_with(client, Arc::new(MockSpeech::new()));
        submit_query(&state, "one".into()).await.unwrap();
        submit_query(&state, "two".into()).await.unwrap();
        assert!(advisor_snapshot(&state).unwrap().error.is_some());

        submit_query(&state, "three".into()).await.unwrap();
        let snap = advisor_snapshot(&state).unwrap();
        assert!(snap.error.is_none());
        assert_eq!(snap.advice.unwrap().title, "Focus better");
    }

    #[tokio::test]
    async fn playback_stopped_before_model_call() {
        let speech = Arc::new(MockSpeech::new());
        let client = Arc::new(SpeechRecordingClient {
            speech: speech.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let (_dir, state) = state_with(client.clone(), speech.clone());

        submit_query(&state, "first".into()).await.unwrap();
        assert!(speak_advice(&state).unwrap());
        submit_query(&state, "second".into()).await.unwrap();

        let seen = client.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1].last(),
            Some(&SpeechCall::StopSpeaking),
            "speech must be stopped before the request goes out"
        );
        assert!(!state.speech().is_speaking());
    }

    #[tokio::test]
    async fn submit_without_playback_does_not_touch_backend() {
        let speech = Arc::new(MockSpeech::new());
        let client = Arc::new(MockModelClient::new(ADVICE_JSON));
        let (_dir, state) = state_with(client, speech.clone());

        submit_query(&state, "question".into()).await.unwrap();
        assert!(speech.calls().is_empty());
        assert!(state.speech().transitions().is_empty());
    }

    #[tokio::test]
    async fn speak_advice_reads_flattened_text() {
        let speech = Arc::new(MockSpeech::new());
        let client = Arc::new(MockModelClient::new(ADVICE_JSON));
        let (_dir, state) = state_with(client, speech.clone());

        assert!(!speak_advice(&state).unwrap());
        submit_query(&state, "question".into()).await.unwrap();
        assert!(speak_advice(&state).unwrap());

        let spoken = match speech.calls().last() {
            Some(SpeechCall::Speak(text)) => text.clone(),
            other => panic!("unexpected call {other:?}"),
        };
        assert!(spoken.starts_with("Beat exam stress."));
        assert!(spoken.contains("Review algebra."));

        assert!(stop_speaking(&state));
        assert!(!stop_speaking(&state));
        assert_eq!(
            state.speech().transitions(),
            vec![SpeechTransition::SpeakingStarted, SpeechTransition::SpeakingStopped]
        );
    }

    #[test]
    fn dictation_appends_to_draft() {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::new(
            Arc::new(MockModelClient::new(ADVICE_JSON)),
            Arc::new(MockSpeech::new()),
            PreferenceStore::in_dir(dir.path()),
        );
        update_draft(&state, "How do I".into()).unwrap();

        assert!(start_listening(&state));
        state.speech().on_partial_result("stay");
        state.speech().on_final_result("stay focused?");
        assert_eq!(advisor_snapshot(&state).unwrap().speech.interim, "");

        let draft = stop_listening(&state).unwrap();
        assert_eq!(draft, "How do I stay focused?");
        let snap = advisor_snapshot(&state).unwrap();
        assert!(!snap.speech.listening);
        assert!(snap.can_submit);
    }

    #[test]
    fn stop_listening_when_idle_keeps_draft() {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::new(
            Arc::new(MockModelClient::new(ADVICE_JSON)),
            Arc::new(MockSpeech::new()),
            PreferenceStore::in_dir(dir.path()),
        );
        update_draft(&state, "draft".into()).unwrap();
        assert_eq!(stop_listening(&state).unwrap(), "draft");
    }

    #[test]
    fn late_transcript_does_not_reach_draft_on_repeat_stop() {
        let dir = tempfile::tempdir().unwrap();
        let state = CoreState::new(
            Arc::new(MockModelClient::new(ADVICE_JSON)),
            Arc::new(MockSpeech::new()),
            PreferenceStore::in_dir(dir.path()),
        );
        update_draft(&state, "draft".into()).unwrap();
        start_listening(&state);
        assert_eq!(stop_listening(&state).unwrap(), "draft");

        state.speech().on_final_result("late words");
        let before = advisor_snapshot(&state).unwrap();
        assert_eq!(stop_listening(&state).unwrap(), "draft");
        let after = advisor_snapshot(&state).unwrap();
        assert_eq!(after.draft, before.draft);
        assert_eq!(after.speech, before.speech);
    }

    #[test]
    fn submission_serializes_with_outcome_tag() {
        let json = serde_json::to_value(AdviceSubmission::Failed("boom".into())).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["value"], "boom");
        let json = serde_json::to_value(AdviceSubmission::Ignored).unwrap();
        assert_eq!(json["outcome"], "ignored");
    }
}
