use super::{read_uploads, AppState};
use crate::doc_processor;
use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::channel::oneshot;
use std::path::{Path, PathBuf};
use tauri::{AppHandle, State};
use tauri_plugin_dialog::{DialogExt, FilePath};
use tauri_plugin_opener::OpenerExt;
use tracing::info;

/// Native file picker. Returns no paths when the user cancels.
#[tauri::command]
pub async fn pick_documents(app: AppHandle, pdf_only: Option<bool>) -> Result<Vec<String>, AppError> {
    let extensions: &[&str] = if pdf_only.unwrap_or(false) {
        &["pdf"]
    } else {
        &["pdf", "txt", "md"]
    };

    let (tx, rx) = oneshot::channel();
    app.dialog()
        .file()
        .add_filter("Documents", extensions)
        .pick_files(move |picked| {
            let _ = tx.send(picked);
        });
    let picked = rx
        .await
        .map_err(|_| AppError::Desktop("File dialog closed unexpectedly".into()))?;

    picked
        .unwrap_or_default()
        .into_iter()
        .map(|p| to_path(p).map(|p| p.display().to_string()))
        .collect()
}

/// Extracted text of the picked files, one file per line break.
#[tauri::command]
pub fn preview_document(paths: Vec<String>) -> Result<String, AppError> {
    let uploads = read_uploads(&paths)?;
    let text = doc_processor::extract_combined(&uploads, "\n")?;
    if text.trim().is_empty() {
        return Err(AppError::NoDocuments);
    }
    Ok(text)
}

#[tauri::command]
pub fn open_artifact(app: AppHandle, state: State<'_, AppState>, path: String) -> Result<(), AppError> {
    let path = owned_artifact(&state, &path)?;
    app.opener()
        .open_path(path.display().to_string(), None::<&str>)
        .map_err(|e| AppError::Desktop(e.to_string()))
}

/// Copy an artifact to a location picked in a save dialog.
#[tauri::command]
pub async fn save_artifact(
    app: AppHandle,
    state: State<'_, AppState>,
    path: String,
) -> Result<Option<String>, AppError> {
    let source = owned_artifact(&state, &path)?;
    let file_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact")
        .to_string();

    let (tx, rx) = oneshot::channel();
    app.dialog()
        .file()
        .set_file_name(file_name)
        .save_file(move |picked| {
            let _ = tx.send(picked);
        });
    let Some(target) = rx
        .await
        .map_err(|_| AppError::Desktop("Save dialog closed unexpectedly".into()))?
    else {
        return Ok(None);
    };

    let target = to_path(target)?;
    tokio::fs::copy(&source, &target).await?;
    info!(target = %target.display(), "artifact saved");
    Ok(Some(target.display().to_string()))
}

/// Inline `data:` URI so the page can show a cover or play audio.
#[tauri::command]
pub async fn artifact_data_uri(state: State<'_, AppState>, path: String, mime: String) -> Result<String, AppError> {
    let path = owned_artifact(&state, &path)?;
    let bytes = tokio::fs::read(&path).await?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

fn owned_artifact(state: &AppState, path: &str) -> Result<PathBuf, AppError> {
    let path = Path::new(path);
    if !state.artifacts.contains(path) {
        return Err(AppError::InvalidInput(format!(
            "'{}' is not a generated file",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

fn to_path(picked: FilePath) -> Result<PathBuf, AppError> {
    picked
        .into_path()
        .map_err(|e| AppError::Desktop(e.to_string()))
}
