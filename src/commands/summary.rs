use super::{read_uploads, AppState};
use crate::error::AppError;
use crate::summarize::{self, LoadedSource, SummaryOptions, SummaryResult, SummarySource};
use serde::Deserialize;
use tauri::State;

/// What the summary page submits. PDFs arrive as a picked path.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SourceInput {
    Pdf(String),
    BlogUrl(String),
    BlogText(String),
    Youtube(String),
}

impl SourceInput {
    fn into_source(self) -> Result<SummarySource, AppError> {
        Ok(match self {
            SourceInput::Pdf(path) => {
                let upload = read_uploads(&[path])?
                    .pop()
                    .ok_or(AppError::NoDocuments)?;
                SummarySource::Pdf(upload)
            }
            SourceInput::BlogUrl(url) => SummarySource::BlogUrl(url),
            SourceInput::BlogText(text) => SummarySource::BlogText(text),
            SourceInput::Youtube(url) => SummarySource::YouTube(url),
        })
    }
}

#[tauri::command]
pub async fn load_summary_source(
    state: State<'_, AppState>,
    source: SourceInput,
) -> Result<LoadedSource, AppError> {
    summarize::load_source(&state.settings, &source.into_source()?).await
}

#[tauri::command]
pub async fn summarize(
    state: State<'_, AppState>,
    text: String,
    options: Option<SummaryOptions>,
) -> Result<SummaryResult, AppError> {
    let options = options.unwrap_or_default();
    summarize::summarize(&state.settings, &text, &options).await
}
