use super::AppState;
use crate::error::AppError;
use crate::slides::{self, PresentationResult};
use tauri::State;

#[tauri::command]
pub async fn generate_presentation(
    state: State<'_, AppState>,
    topic: String,
) -> Result<PresentationResult, AppError> {
    slides::generate_presentation(&state.settings, &state.artifacts, &topic).await
}
