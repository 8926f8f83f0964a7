//! Audiobooks from uploaded documents, plus podcast-style cover art.

use crate::artifacts::{Artifact, ArtifactKind, ArtifactStore};
use crate::config::Settings;
use crate::doc_processor::{self, TextSplitter, Upload};
use crate::error::{AppError, Result};
use crate::llm::openai::{generate_image, synthesize_speech};
use crate::pptx::{Picture, PictureFormat};
use crate::sources::download;
use serde::Serialize;
use tracing::{debug, info, warn};

pub const AUDIO_FILE_NAME: &str = "generated_audiobook.mp3";

fn cover_prompt(title: &str) -> String {
    format!(
        "Create an artistic podcast cover for a podcast titled '{title}'. \
         It should reflect the topics discussed in the research paper, \
         include things related to podcasts in the image like microphone, speaker, headphones and studio, \
         only the ones that suit the design. Include no text in the cover image."
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct AudiobookResult {
    pub artifact: Artifact,
    /// Number of speech requests the text was split into.
    pub parts: usize,
}

/// Text of every upload, as it will be read aloud.
pub fn preview_text(uploads: &[Upload]) -> Result<String> {
    let text = doc_processor::extract_combined(uploads, "\n")?;
    if text.trim().is_empty() {
        return Err(AppError::NoDocuments);
    }
    Ok(text)
}

pub async fn generate_audiobook(
    settings: &Settings,
    artifacts: &ArtifactStore,
    uploads: &[Upload],
) -> Result<AudiobookResult> {
    let text = preview_text(uploads)?;
    let config = settings.openai()?;

    let parts = TextSplitter::speech().split(&text);
    info!(files = uploads.len(), parts = parts.len(), "synthesizing audiobook");

    let (path, mut file) = artifacts.create(AUDIO_FILE_NAME).await?;
    for (i, part) in parts.iter().enumerate() {
        let written = synthesize_speech(&config, part, &mut file).await;
        match written {
            Ok(bytes) => debug!(part = i, bytes, "speech part written"),
            Err(e) => {
                drop(file);
                if let Err(rm) = tokio::fs::remove_file(&path).await {
                    warn!(error = %rm, "could not remove partial audiobook");
                }
                return Err(e.into());
            }
        }
    }
    drop(file);

    let artifact = artifacts.describe(ArtifactKind::Audio, path, "audio/mpeg").await?;
    Ok(AudiobookResult {
        artifact,
        parts: parts.len(),
    })
}

pub async fn generate_cover_art(
    settings: &Settings,
    artifacts: &ArtifactStore,
    title: &str,
) -> Result<Artifact> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput(
            "Please enter the paper title.".into(),
        ));
    }
    let config = settings.openai()?;

    let url = generate_image(&config, &cover_prompt(title)).await?;
    let bytes = download(&url).await?;
    let picture = Picture::from_bytes(bytes)?;

    let file_name = match picture.format() {
        PictureFormat::Png => "cover_art.png",
        PictureFormat::Jpeg => "cover_art.jpeg",
    };
    Ok(artifacts
        .store(
            ArtifactKind::Image,
            file_name,
            picture.format().mime(),
            picture.bytes(),
        )
        .await?)
}
