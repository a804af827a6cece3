//! Shared application state behind the commands layer.
//!
//! `CoreState` is built once at startup, wrapped in `Arc`, and handed to every
//! command. It owns the model client, the session's speech controller, the
//! preference store, the UI-facing state of both apps and their in-flight gates.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::config::{self, GeminiConfig};
use crate::in_flight::{InFlight, OperationKind};
use crate::pipeline::advice::AdviceResponse;
use crate::pipeline::extraction::{ExtractionResult, UploadedFile};
use crate::pipeline::model::{GeminiClient, ModelClient};
use crate::preferences::{PreferenceStore, PreferencesError};
use crate::speech::{NullSpeech, SpeechCapability, SpeechController};

// ═══════════════════════════════════════════════════════════
// Per-app state
// ═══════════════════════════════════════════════════════════

/// Image score extractor: selection, last run's results, progress line.
#[derive(Debug, Default)]
pub struct ExtractionState {
    pub files: Vec<UploadedFile>,
    pub results: Vec<ExtractionResult>,
    /// "Processing file i of N: name" while a run is active.
    pub status: Option<String>,
    /// Last selection or export error shown to the user.
    pub error: Option<String>,
}

/// Study advisor: the query being composed, the published advice, the error.
#[derive(Debug, Default, Clone, Serialize)]
pub struct AdvisorState {
    pub draft: String,
    pub advice: Option<AdviceResponse>,
    pub error: Option<String>,
}

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    model: Arc<dyn ModelClient>,
    /// One controller per session; also the event sink for the backend.
    speech: Arc<SpeechController>,
    preferences: PreferenceStore,
    /// Accent colour, read from disk once at construction.
    accent: Mutex<String>,
    extraction: Mutex<ExtractionState>,
    advisor: Mutex<AdvisorState>,
    extraction_gate: Arc<InFlight>,
    advice_gate: Arc<InFlight>,
}

impl CoreState {
    pub fn new(
        model: Arc<dyn ModelClient>,
        speech: Arc<dyn SpeechCapability>,
        preferences: PreferenceStore,
    ) -> Self {
        let accent = preferences.load_accent_color();
        Self {
            model,
            speech: Arc::new(SpeechController::new(speech)),
            preferences,
            accent: Mutex::new(accent),
            extraction: Mutex::new(ExtractionState::default()),
            advisor: Mutex::new(AdvisorState::default()),
            extraction_gate: InFlight::new(),
            advice_gate: InFlight::new(),
        }
    }

    /// Production wiring: `.env`, Gemini from the environment, no speech
    /// backend, preferences in the app data directory.
    pub fn from_env() -> Self {
        config::load_dotenv();
        let gemini = GeminiConfig::from_env();
        config::check_credentials(&gemini);
        Self::new(
            Arc::new(GeminiClient::new(gemini)),
            Arc::new(NullSpeech),
            PreferenceStore::default_location(),
        )
    }

    /// Owned handle for moving into a blocking task.
    pub fn model(&self) -> Arc<dyn ModelClient> {
        Arc::clone(&self.model)
    }

    pub fn speech(&self) -> &Arc<SpeechController> {
        &self.speech
    }

    pub fn preferences(&self) -> &PreferenceStore {
        &self.preferences
    }

    // ── App state ───────────────────────────────────────────

    pub fn extraction(&self) -> Result<MutexGuard<'_, ExtractionState>, CoreError> {
        self.extraction.lock().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn advisor(&self) -> Result<MutexGuard<'_, AdvisorState>, CoreError> {
        self.advisor.lock().map_err(|_| CoreError::LockPoisoned)
    }

    // ── Gates ───────────────────────────────────────────────

    pub fn gate(&self, kind: OperationKind) -> &Arc<InFlight> {
        match kind {
            OperationKind::ScoreExtraction => &self.extraction_gate,
            OperationKind::AdviceRequest => &self.advice_gate,
        }
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.gate(kind).is_busy()
    }

    // ── Accent colour ───────────────────────────────────────

    pub fn accent_color(&self) -> Result<String, CoreError> {
        Ok(self
            .accent
            .lock()
            .map_err(|_| CoreError::LockPoisoned)?
            .clone())
    }

    /// Persist first; the in-memory value only changes once the write succeeded.
    pub fn set_accent_color(&self, color: &str) -> Result<String, CoreError> {
        let stored = self.preferences.save_accent_color(color)?;
        *self.accent.lock().map_err(|_| CoreError::LockPoisoned)? = stored.clone();
        Ok(stored)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("{0} already in progress")]
    Busy(OperationKind),
    #[error(transparent)]
    Preferences(#[from] PreferencesError),
}
