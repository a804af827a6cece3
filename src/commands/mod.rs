//! UI-facing entry points over `Arc<CoreState>`.
//!
//! Every command returns display strings on failure so any shell (webview,
//! TUI, HTTP) can show them as-is. Model work always runs on a blocking thread.

pub mod advisor;
pub mod extraction;
pub mod settings;

use serde::Serialize;

use crate::config;
use crate::core_state::CoreState;
use crate::in_flight::{ActiveOperation, OperationKind};

/// Health check command: verifies the backend is running.
pub fn health_check() -> String {
    tracing::debug!("Health check called");
    "ok".to_string()
}

/// Header information and what is currently running.
#[derive(Debug, Clone, Serialize)]
pub struct AppStatus {
    pub app_name: &'static str,
    pub version: &'static str,
    pub model: String,
    pub running: Vec<ActiveOperation>,
}

pub fn app_status(state: &CoreState) -> AppStatus {
    let running = [OperationKind::ScoreExtraction, OperationKind::AdviceRequest]
        .into_iter()
        .filter_map(|kind| state.gate(kind).current_operation())
        .collect();
    AppStatus {
        app_name: config::APP_NAME,
        version: config::APP_VERSION,
        model: state.model().model_name().to_string(),
        running,
    }
}
