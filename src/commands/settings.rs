//! Accent colour preference.

use crate::core_state::CoreState;

pub fn get_accent_color(state: &CoreState) -> Result<String, String> {
    state.accent_color().map_err(|e| e.to_string())
}

/// Persist a new accent colour (`#rrggbb`). Returns the stored, lowercased form.
pub fn set_accent_color(state: &CoreState, color: String) -> Result<String, String> {
    let stored = state.set_accent_color(&color).map_err(|e| e.to_string())?;
    tracing::info!(color = %stored, "Accent colour changed");
    Ok(stored)
}
