use super::AppState;
use crate::error::AppError;
use crate::study::{self, Flashcard, QuizLine, DEFAULT_COUNT};
use serde::Serialize;
use tauri::State;

#[derive(Serialize)]
pub struct QuizOutput {
    pub raw: String,
    pub lines: Vec<QuizLine>,
}

#[derive(Serialize)]
pub struct FlashcardOutput {
    pub raw: String,
    pub cards: Vec<Flashcard>,
}

#[tauri::command]
pub async fn generate_quiz(
    state: State<'_, AppState>,
    text: String,
    count: Option<u32>,
) -> Result<QuizOutput, AppError> {
    let raw = study::generate_quiz(&state.settings, &text, count.unwrap_or(DEFAULT_COUNT)).await?;
    Ok(QuizOutput {
        lines: study::format_quiz(&raw),
        raw,
    })
}

#[tauri::command]
pub async fn generate_flashcards(
    state: State<'_, AppState>,
    text: String,
    count: Option<u32>,
) -> Result<FlashcardOutput, AppError> {
    let raw = study::generate_flashcards(&state.settings, &text, count.unwrap_or(DEFAULT_COUNT)).await?;
    Ok(FlashcardOutput {
        cards: study::parse_flashcards(&raw),
        raw,
    })
}
