use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::types::{parse_model_output, ModelClient, ModelRequest};
use super::ModelError;
use crate::config::{self, GeminiConfig};

/// Connect timeout only. A slow generation is allowed to take as long as it takes.
const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Gemini `generateContent` client (blocking).
///
/// The underlying HTTP client is built per call so that construction and drop
/// both happen on the calling (blocking) thread.
pub struct GeminiClient {
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }

    /// Client configured from `GEMINI_API_KEY` / `GEMINI_MODEL` / `GEMINI_BASE_URL`.
    pub fn from_env() -> Self {
        Self::new(GeminiConfig::from_env())
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

// ──────────────────────────────────────────────
// Wire types
// ──────────────────────────────────────────────

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    /// Base64-encoded bytes.
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

/// Response body from `generateContent`.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ──────────────────────────────────────────────
// Request / response shaping
// ──────────────────────────────────────────────

pub(crate) fn build_request_body(request: &ModelRequest) -> GenerateContentRequest {
    let mut parts = Vec::with_capacity(2);
    if let Some(image) = &request.image {
        parts.push(Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.media_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
            }),
        });
    }
    parts.push(Part {
        text: Some(request.prompt.clone()),
        inline_data: None,
    });

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".into()),
            parts,
        }],
        system_instruction: request.system.as_ref().map(|system| Content {
            role: None,
            parts: vec![Part {
                text: Some(system.clone()),
                inline_data: None,
            }],
        }),
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: request.schema.to_gemini(),
        },
    }
}

/// Concatenate the text parts of the first candidate.
pub(crate) fn extract_response_text(response: &GenerateContentResponse) -> Result<String, ModelError> {
    let Some(candidate) = response.candidates.first() else {
        let reason = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
            .map(|r| format!("prompt blocked ({r})"))
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(ModelError::EmptyResponse(reason));
    };

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .as_deref()
            .map(|r| format!("finish reason {r}"))
            .unwrap_or_else(|| "candidate has no text".to_string());
        return Err(ModelError::EmptyResponse(reason));
    }
    Ok(text)
}

/// Pull `error.message` out of an API error body, or pass the body through.
pub(crate) fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty error body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

impl ModelClient for GeminiClient {
    fn generate(&self, request: &ModelRequest) -> Result<serde_json::Value, ModelError> {
        request.check()?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ModelError::MissingApiKey(config::API_KEY_VAR.to_string()))?;

        let _span = tracing::info_span!(
            "model_generate",
            model = %self.config.model,
            image_size = request.image.as_ref().map_or(0, |i| i.bytes.len()),
        )
        .entered();
        let start = std::time::Instant::now();

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(None)
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let response = client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&build_request_body(request))
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ModelError::Transport(format!(
                        "could not reach {}; check your internet connection",
                        self.config.base_url
                    ))
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Model API returned an error");
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| ModelError::MalformedJson(format!("unreadable API response: {e}")))?;
        let text = extract_response_text(&parsed)?;
        let value = parse_model_output(&text, &request.schema)?;

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            response_len = text.len(),
            "Model response validated"
        );
        Ok(value)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
