use super::{read_uploads, AppState};
use crate::error::AppError;
use crate::llm::ModelPreset;
use crate::retrieval::{self, ProcessedDocuments};
use crate::session::models::Message;
use serde::Serialize;
use tauri::State;

#[derive(Clone, Serialize)]
pub struct ChatReply {
    pub messages: Vec<Message>,
    pub notice: Option<String>,
}

#[tauri::command]
pub async fn process_documents(
    state: State<'_, AppState>,
    paths: Vec<String>,
) -> Result<ProcessedDocuments, AppError> {
    let uploads = read_uploads(&paths)?;
    retrieval::process_documents(&state.settings, &state.session, &uploads).await
}

#[tauri::command]
pub async fn ask_question(
    state: State<'_, AppState>,
    question: String,
    preset: Option<ModelPreset>,
) -> Result<ChatReply, AppError> {
    let preset = preset.unwrap_or_default();
    let messages = retrieval::ask(&state.settings, &state.session, &question, preset).await?;
    let notice = state.settings.resolve_model(preset)?.notice;
    Ok(ChatReply { messages, notice })
}

#[tauri::command]
pub fn get_history(state: State<'_, AppState>) -> Result<Vec<Message>, AppError> {
    retrieval::history(&state.session)
}

#[tauri::command]
pub fn get_document_text(state: State<'_, AppState>) -> Result<Option<String>, AppError> {
    retrieval::document_text(&state.session)
}

#[tauri::command]
pub fn reset_session(state: State<'_, AppState>) -> Result<(), AppError> {
    retrieval::reset(&state.session)
}
