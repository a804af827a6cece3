use serde::de::DeserializeOwned;

use super::schema::Schema;
use super::ModelError;

/// Image encodings the model accepts.
pub const ACCEPTED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg"];

/// Binary image attached to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, media_type: &str) -> Self {
        Self {
            bytes,
            media_type: media_type.to_string(),
        }
    }
}

/// One model call: instruction, optional image, and the response contract.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub prompt: String,
    /// Persona or system instruction, sent separately from the prompt.
    pub system: Option<String>,
    pub image: Option<ImagePayload>,
    pub schema: Schema,
}

impl ModelRequest {
    pub fn new(prompt: &str, schema: Schema) -> Self {
        Self {
            prompt: prompt.to_string(),
            system: None,
            image: None,
            schema,
        }
    }

    pub fn with_system(mut self, system: &str) -> Self {
        self.system = Some(system.to_string());
        self
    }

    pub fn with_image(mut self, image: ImagePayload) -> Self {
        self.image = Some(image);
        self
    }

    /// Check the input constraints before anything leaves the process.
    pub fn check(&self) -> Result<(), ModelError> {
        if self.prompt.trim().is_empty() {
            return Err(ModelError::InvalidRequest("prompt is empty".into()));
        }
        if let Some(image) = &self.image {
            if !is_accepted_media_type(&image.media_type) {
                return Err(ModelError::UnsupportedMediaType(image.media_type.clone()));
            }
            if image.bytes.is_empty() {
                return Err(ModelError::InvalidRequest("image is empty".into()));
            }
        }
        Ok(())
    }
}

/// Case-insensitive match against `ACCEPTED_MEDIA_TYPES`, ignoring parameters.
pub fn is_accepted_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_MEDIA_TYPES.contains(&essence.as_str())
}

/// Generative model abstraction (allows mocking).
///
/// Implementations must return JSON that already satisfies `request.schema`.
pub trait ModelClient: Send + Sync {
    fn generate(&self, request: &ModelRequest) -> Result<serde_json::Value, ModelError>;

    /// Human-readable model identifier for logs.
    fn model_name(&self) -> &str;
}

/// `generate`, then deserialize into the target entity.
pub fn generate_typed<T: DeserializeOwned>(
    client: &dyn ModelClient,
    request: &ModelRequest,
) -> Result<T, ModelError> {
    decode_validated(client.generate(request)?)
}

/// Deserialize a schema-validated value. A failure here means the schema and
/// the target type disagree, which is reported as a violation at the root.
pub fn decode_validated<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ModelError> {
    serde_json::from_value(value).map_err(|e| {
        ModelError::SchemaViolation(super::schema::SchemaViolation::new("$", &e.to_string()))
    })
}

/// Parse raw model text as JSON and check it against `schema`.
///
/// Tolerates a surrounding Markdown code fence, which some models emit even
/// when JSON output is requested.
pub fn parse_model_output(text: &str, schema: &Schema) -> Result<serde_json::Value, ModelError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(ModelError::EmptyResponse("response text is empty".into()));
    }
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ModelError::MalformedJson(e.to_string()))?;
    schema.validate(&value)?;
    Ok(value)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
