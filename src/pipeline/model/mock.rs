use std::collections::VecDeque;
use std::sync::Mutex;

use super::types::{parse_model_output, ModelClient, ModelRequest};
use super::ModelError;

/// What the mock saw for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub system: Option<String>,
    pub media_type: Option<String>,
    pub image_len: usize,
}

/// Mock model client for testing. Replays scripted raw responses in order.
///
/// Raw text goes through the same JSON parse and schema check as the real
/// client. When the script runs out, the fallback response is used.
pub struct MockModelClient {
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    fallback: Result<String, ModelError>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockModelClient {
    /// Every call returns `response`.
    pub fn new(response: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Ok(response.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `error`.
    pub fn failing(error: ModelError) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue one response ahead of the fallback.
    pub fn then(self, response: &str) -> Self {
        self.push(Ok(response.to_string()));
        self
    }

    /// Queue one failure ahead of the fallback.
    pub fn then_fail(self, error: ModelError) -> Self {
        self.push(Err(error));
        self
    }

    fn push(&self, entry: Result<String, ModelError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl ModelClient for MockModelClient {
    fn generate(&self, request: &ModelRequest) -> Result<serde_json::Value, ModelError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                prompt: request.prompt.clone(),
                system: request.system.clone(),
                media_type: request.image.as_ref().map(|i| i.media_type.clone()),
                image_len: request.image.as_ref().map_or(0, |i| i.bytes.len()),
            });
        }
        request.check()?;

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or_else(|| self.fallback.clone());
        let text = next?;
        parse_model_output(&text, &request.schema)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
