//! Slide deck generation: titles, then content per title, then a PPTX.

use crate::artifacts::{Artifact, ArtifactKind, ArtifactStore};
use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::llm::{ChatMessage, ChatRequest, ModelPreset, Provider};
use crate::pptx::{self, Deck, Picture, Slide};
use crate::sources::{download, unsplash};
use serde::Serialize;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are an AI assistant that helps create presentations.";
const MAX_TOKENS: u32 = 100;
pub const SUBTITLE: &str = "Generated with AI";

#[derive(Debug, Clone, Serialize)]
pub struct PresentationResult {
    pub artifact: Artifact,
    pub titles: Vec<String>,
    /// Non-fatal problems: missing slide content or pictures.
    pub notices: Vec<String>,
}

pub async fn generate_presentation(
    settings: &Settings,
    artifacts: &ArtifactStore,
    topic: &str,
) -> Result<PresentationResult> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(AppError::InvalidInput(
            "Please enter a topic for your presentation.".into(),
        ));
    }
    let provider = Provider::OpenAi(settings.openai()?);
    let mut notices = Vec::new();

    let raw_titles = ask(
        &provider,
        format!("Generate 10 slide titles for the topic '{topic}'."),
    )
    .await?;
    let titles = split_titles(&raw_titles);
    if titles.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "No slide titles were generated for '{topic}'."
        )));
    }
    info!(topic, slides = titles.len(), "slide titles generated");

    let mut deck = Deck::new(topic, SUBTITLE);
    let mut pictures_enabled = true;
    for title in &titles {
        let body = match ask(&provider, format!("Generate content for the slide: '{title}'.")).await {
            Ok(body) => body,
            Err(e) => {
                warn!(title = %title, error = %e, "slide content failed");
                notices.push(format!("Error generating slide content for '{title}': {e}"));
                String::new()
            }
        };

        let picture = if pictures_enabled {
            match fetch_picture(settings, topic).await {
                Ok(picture) => Some(picture),
                Err(AppError::Config(e)) => {
                    // Without a key no slide will get a picture; say so once.
                    notices.push(e.to_string());
                    pictures_enabled = false;
                    None
                }
                Err(e) => {
                    warn!(title = %title, error = %e, "slide picture skipped");
                    notices.push(format!("No picture for '{title}': {e}"));
                    None
                }
            }
        } else {
            None
        };

        deck.push(Slide {
            title: title.clone(),
            body: body.trim().to_string(),
            picture,
        });
    }

    let bytes = deck.to_bytes()?;
    let artifact = artifacts
        .store(
            ArtifactKind::Slides,
            &format!("{topic}_presentation.pptx"),
            pptx::MIME,
            &bytes,
        )
        .await?;

    Ok(PresentationResult {
        artifact,
        titles,
        notices,
    })
}

async fn ask(provider: &Provider, prompt: String) -> Result<String> {
    let request = ChatRequest::new(
        ModelPreset::Gpt4.model_id(),
        vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)],
    )
    .max_tokens(MAX_TOKENS);
    Ok(provider.complete(&request).await?)
}

async fn fetch_picture(settings: &Settings, topic: &str) -> Result<Picture> {
    let url = unsplash::fetch_image_url(settings, topic).await?;
    let bytes = download(&url).await?;
    Ok(Picture::from_bytes(bytes)?)
}

/// One title per non-blank line.
pub fn split_titles(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_titles_drops_blank_lines() {
        let raw = "1. Introduction\n\n2. History\r\n   \n3. Outlook";
        assert_eq!(split_titles(raw), vec!["1. Introduction", "2. History", "3. Outlook"]);
        assert!(split_titles("\n \n").is_empty());
    }

    #[tokio::test]
    async fn test_blank_topic_is_rejected() {
        let artifacts = ArtifactStore::ephemeral().unwrap();
        let err = generate_presentation(&Settings::default(), &artifacts, "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_key_is_reported() {
        let artifacts = ArtifactStore::ephemeral().unwrap();
        let err = generate_presentation(&Settings::default(), &artifacts, "Cells")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"), "got: {err}");
    }
}
