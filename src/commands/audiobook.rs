use super::{read_uploads, AppState};
use crate::artifacts::Artifact;
use crate::audiobook::{self, AudiobookResult};
use crate::error::AppError;
use tauri::State;

#[tauri::command]
pub async fn generate_audiobook(
    state: State<'_, AppState>,
    paths: Vec<String>,
) -> Result<AudiobookResult, AppError> {
    let uploads = read_uploads(&paths)?;
    audiobook::generate_audiobook(&state.settings, &state.artifacts, &uploads).await
}

#[tauri::command]
pub async fn generate_cover_art(
    state: State<'_, AppState>,
    title: String,
) -> Result<Artifact, AppError> {
    audiobook::generate_cover_art(&state.settings, &state.artifacts, &title).await
}
