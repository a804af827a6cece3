//! Model Client: one request/response cycle against a generative model with
//! schema-validated JSON output.
//!
//! ```text
//! ModelRequest ─► ModelClient::generate ─► raw JSON ─► Schema::validate ─► Value
//! ```
//!
//! `GeminiClient` is the production client; `MockModelClient` is scripted and
//! never touches the network.

pub mod types;
pub mod schema;
pub mod gemini;
pub mod mock;

pub use types::*;
pub use schema::*;
pub use gemini::GeminiClient;
pub use mock::MockModelClient;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("API key is not configured (set {0})")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    Transport(String),

    /// Non-2xx reply. Displays the API's own message; the status is for logs.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Model returned no content: {0}")]
    EmptyResponse(String),

    #[error("Model response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("Model response does not match the expected shape: {0}")]
    SchemaViolation(#[from] SchemaViolation),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported image type: {0}")]
    UnsupportedMediaType(String),
}
