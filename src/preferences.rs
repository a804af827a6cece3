//! Persisted UI preferences: a small JSON key-value file in the app data dir.
//!
//! Only the accent colour lives here today. It is read once at startup and
//! written on every change.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config;

pub const PREFERENCES_FILE: &str = "preferences.json";
pub const ACCENT_COLOR_KEY: &str = "study-advisor.accent-color";
/// Accent colour used on first run or when the stored value is unusable.
pub const DEFAULT_ACCENT_COLOR: &str = "#4f46e5";

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid hex colour regex"));

#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error("Invalid colour '{0}': expected #rrggbb")]
    InvalidColor(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preferences file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Normalize a `#rrggbb` string to lowercase, rejecting anything else.
pub fn normalize_hex_color(input: &str) -> Result<String, PreferencesError> {
    let trimmed = input.trim();
    if HEX_COLOR.is_match(trimmed) {
        Ok(trimmed.to_ascii_lowercase())
    } else {
        Err(PreferencesError::InvalidColor(input.to_string()))
    }
}

/// JSON-file preference store.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at `<dir>/preferences.json`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(PREFERENCES_FILE))
    }

    /// Store in the application data directory.
    pub fn default_location() -> Self {
        Self::in_dir(&config::app_data_dir())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored accent colour, or the default when absent or unreadable.
    pub fn load_accent_color(&self) -> String {
        let stored = match self.read_all() {
            Ok(map) => map.get(ACCENT_COLOR_KEY).and_then(Value::as_str).map(str::to_string),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable preferences");
                None
            }
        };
        stored
            .and_then(|c| normalize_hex_color(&c).ok())
            .unwrap_or_else(|| DEFAULT_ACCENT_COLOR.to_string())
    }

    /// Validate and persist the accent colour. Returns the stored form.
    pub fn save_accent_color(&self, color: &str) -> Result<String, PreferencesError> {
        let color = normalize_hex_color(color)?;
        // A corrupt file is replaced rather than blocking the write.
        let mut map = self.read_all().unwrap_or_default();
        map.insert(ACCENT_COLOR_KEY.to_string(), Value::String(color.clone()));
        self.write_all(&map)?;
        tracing::debug!(color = %color, "Accent colour saved");
        Ok(color)
    }

    fn read_all(&self) -> Result<Map<String, Value>, PreferencesError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write via a sibling temp file and rename.
    fn write_all(&self, map: &Map<String, Value>) -> Result<(), PreferencesError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
