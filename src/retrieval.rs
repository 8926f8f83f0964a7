//! Chat with uploaded documents.
//!
//! Processing builds the session's similarity index. Each question is made
//! standalone with the help of the history, matched against the index and
//! answered from the four closest chunks.

use crate::config::Settings;
use crate::doc_processor::{self, TextSplitter, Upload};
use crate::embedding::{embed_all, generate_embeddings, search_similar, EMBEDDING_MODEL};
use crate::error::{AppError, Result};
use crate::llm::{ChatRequest, ModelPreset};
use crate::session::models::Message;
use crate::session::SessionStore;
use serde::Serialize;
use tracing::{debug, info};

const TOP_K: usize = 4;

const CONDENSE_PROMPT: &str = "Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.\n\nChat History:\n{chat_history}\nFollow Up Input: {question}\nStandalone question:";

const QA_PROMPT: &str = "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n{context}\n\nQuestion: {question}\nHelpful Answer:";

#[derive(Debug, Clone, Serialize)]
pub struct ProcessedDocuments {
    /// Raw extracted text, shown in the "view text" panel.
    pub text: String,
    pub chunk_count: usize,
}

/// Extract, split and embed `uploads`, replacing whatever the session held.
pub async fn process_documents(
    settings: &Settings,
    session: &SessionStore,
    uploads: &[Upload],
) -> Result<ProcessedDocuments> {
    if uploads.is_empty() {
        return Err(AppError::NoDocuments);
    }

    // Page texts are appended directly.
    let text = doc_processor::extract_combined(uploads, "")?;
    if text.trim().is_empty() {
        return Err(AppError::NoDocuments);
    }
    let config = settings.openai()?;

    let chunks = TextSplitter::chat().split(&text);
    info!(files = uploads.len(), chunks = chunks.len(), "documents split");

    let embeddings = embed_all(&config, &chunks).await?;
    session.replace_index(&text, &chunks, &embeddings)?;

    info!(chunks = chunks.len(), "session index rebuilt");
    Ok(ProcessedDocuments {
        chunk_count: chunks.len(),
        text,
    })
}

/// Answer `question` from the session index and return the full history.
pub async fn ask(
    settings: &Settings,
    session: &SessionStore,
    question: &str,
    preset: ModelPreset,
) -> Result<Vec<Message>> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::InvalidInput("Please enter a question.".into()));
    }

    // Snapshot the session before any await; the lock is not held across calls.
    let snapshot = session.snapshot()?;
    let chunks = snapshot.chunks;
    if chunks.is_empty() {
        return Err(AppError::InvalidInput(
            "Please upload and process your documents first.".into(),
        ));
    }
    let history = snapshot.history;

    let resolved = settings.resolve_model(preset)?;
    let embed_config = settings.openai()?;

    let standalone = if history.is_empty() {
        question.to_string()
    } else {
        let prompt = CONDENSE_PROMPT
            .replace("{chat_history}", &format_history(&history))
            .replace("{question}", question);
        let condensed = resolved
            .provider
            .complete(&ChatRequest::prompt(&resolved.model, prompt).temperature(0.0))
            .await?;
        debug!(standalone = %condensed.trim(), "question condensed");
        condensed.trim().to_string()
    };

    let query = generate_embeddings(&embed_config, &[standalone.clone()], EMBEDDING_MODEL).await?;
    let query = query
        .first()
        .ok_or_else(|| AppError::InvalidInput("Failed to embed the question.".into()))?;

    let candidates: Vec<(usize, Vec<f32>)> = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| (i, c.embedding.clone()))
        .collect();
    let context = search_similar(query, &candidates, TOP_K)
        .into_iter()
        .map(|(i, _)| chunks[i].content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let prompt = QA_PROMPT
        .replace("{context}", &context)
        .replace("{question}", &standalone);
    let answer = resolved
        .provider
        .complete(&ChatRequest::prompt(&resolved.model, prompt).temperature(0.0))
        .await?;

    // Rejected if the documents were reprocessed or reset meanwhile.
    session.add_exchange(snapshot.generation, question, answer.trim())?;
    info!(model = %resolved.model, turns = history.len() + 2, "question answered");
    Ok(session.messages()?)
}

pub fn history(session: &SessionStore) -> Result<Vec<Message>> {
    Ok(session.messages()?)
}

/// Text of the last processed documents, if any.
pub fn document_text(session: &SessionStore) -> Result<Option<String>> {
    Ok(session.document_text()?)
}

pub fn reset(session: &SessionStore) -> Result<()> {
    session.reset()?;
    info!("session cleared");
    Ok(())
}

fn format_history(history: &[Message]) -> String {
    history
        .iter()
        .map(|m| {
            let speaker = if m.is_user() { "Human" } else { "Assistant" };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(seq: i64, role: &str, content: &str) -> Message {
        Message {
            id: seq.to_string(),
            seq,
            role: role.into(),
            content: content.into(),
        }
    }

    #[test]
    fn test_format_history() {
        let history = vec![message(0, "user", "What is ATP?"), message(1, "assistant", "Energy.")];
        assert_eq!(format_history(&history), "Human: What is ATP?\nAssistant: Energy.");
    }

    #[tokio::test]
    async fn test_process_requires_uploads() {
        let settings = Settings::default();
        let session = SessionStore::new().unwrap();
        let err = process_documents(&settings, &session, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::NoDocuments));
    }

    #[tokio::test]
    async fn test_extraction_error_before_missing_key() {
        let settings = Settings::default();
        let session = SessionStore::new().unwrap();
        let uploads = vec![Upload::new("paper.pdf", b"not a pdf".to_vec())];
        let err = process_documents(&settings, &session, &uploads).await.unwrap_err();
        assert!(matches!(err, AppError::Extract(_)), "got: {err}");

        let blank = vec![Upload::new("notes.txt", b"   ".to_vec())];
        let err = process_documents(&settings, &session, &blank).await.unwrap_err();
        assert!(matches!(err, AppError::NoDocuments), "got: {err}");
    }

    #[tokio::test]
    async fn test_ask_rejects_blank_question() {
        let settings = Settings::default();
        let session = SessionStore::new().unwrap();
        let err = ask(&settings, &session, "   ", ModelPreset::ChatGpt).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_ask_without_index() {
        let settings = Settings::default();
        let session = SessionStore::new().unwrap();
        let err = ask(&settings, &session, "why?", ModelPreset::ChatGpt).await.unwrap_err();
        assert!(err.to_string().contains("process your documents first"), "got: {err}");
    }
}
