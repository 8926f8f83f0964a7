use super::AppState;
use crate::config::SettingStatus;
use crate::llm::ModelInfo;
use tauri::State;

/// Configured keys for the read-only settings view, secrets masked.
#[tauri::command]
pub fn get_settings(state: State<'_, AppState>) -> Vec<SettingStatus> {
    state.settings.status()
}

#[tauri::command]
pub fn list_model_presets(state: State<'_, AppState>) -> Vec<ModelInfo> {
    state
        .settings
        .available_presets()
        .into_iter()
        .map(|p| p.info())
        .collect()
}
