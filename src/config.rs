use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Grade Lens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Optional model override.
pub const MODEL_VAR: &str = "GEMINI_MODEL";
/// Optional API base URL override (proxies, regional endpoints).
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";
/// Optional data directory override.
pub const DATA_DIR_VAR: &str = "GRADE_LENS_DATA_DIR";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "warn,grade_lens_lib=info,grade_lens=info"
}

/// Directory for persisted preferences and exported files.
///
/// `GRADE_LENS_DATA_DIR` wins; otherwise the platform data dir, falling back
/// to the working directory when the platform has none.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_VAR).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("grade-lens")
}

/// Load `.env` from the working directory, then from the app data dir.
///
/// Variables already present in the process environment are never overridden.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let env_path = app_data_dir().join(".env");
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
}

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// `None` when the key is missing; every call then fails with
    /// `ModelError::MissingApiKey`.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            api_key: read(API_KEY_VAR),
            model: read(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: read(BASE_URL_VAR)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    pub fn with_api_key(api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Startup credential check. A missing key is logged here and surfaces again
/// as a model failure on the first call.
pub fn check_credentials(config: &GeminiConfig) -> bool {
    if config.is_configured() {
        tracing::info!(model = %config.model, "Gemini credentials configured");
        true
    } else {
        tracing::warn!(
            var = API_KEY_VAR,
            "Gemini API key not set; model requests will fail until it is configured"
        );
        false
    }
}
