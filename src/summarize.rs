//! Summaries of a PDF, a blog post or a YouTube transcript.

use crate::config::Settings;
use crate::doc_processor::{self, TextSplitter, Upload};
use crate::error::{AppError, Result};
use crate::llm::{ChatRequest, ModelPreset, Provider};
use crate::sources::{blog, youtube};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_CHUNK_SIZE: usize = 2000;
pub const DEFAULT_OVERLAP: usize = 200;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const MAX_SUMMARIES: u32 = 10;
pub const DEFAULT_PROMPT: &str = "Write a concise summary of the text";

const MAP_PROMPT: &str = "Summarize:\n{text}";
const STUFF_PROMPT: &str = "Write a concise summary of the following:\n\n\n\"{text}\"\n\n\nCONCISE SUMMARY:";
const REFINE_PROMPT: &str = "Your job is to produce a final summary\nWe have provided an existing summary up to a certain point: {existing_answer}\nWe have the opportunity to refine the existing summary (only if needed) with some more context below.\n------------\n{text}\n------------\nGiven the new context, refine the original summary.\nIf the context isn't useful, return the original summary.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SummarySource {
    Pdf(Upload),
    BlogUrl(String),
    BlogText(String),
    #[serde(rename = "youtube")]
    YouTube(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadedSource {
    pub text: String,
    /// Player URL when the source is a video.
    pub video_embed_url: Option<String>,
    /// `data:` URI when the source is a PDF.
    pub pdf_preview: Option<String>,
}

/// Resolve a source into the text to summarise.
pub async fn load_source(settings: &Settings, source: &SummarySource) -> Result<LoadedSource> {
    let loaded = match source {
        SummarySource::Pdf(upload) => {
            let doc = doc_processor::parse_upload(upload)?;
            LoadedSource {
                text: doc.content,
                pdf_preview: (doc.file_type == "pdf")
                    .then(|| doc_processor::pdf_preview_data_uri(&upload.bytes)),
                ..Default::default()
            }
        }
        SummarySource::BlogUrl(url) => {
            let url = url.trim();
            if url.is_empty() {
                return Err(AppError::InvalidInput("Please enter a blog URL.".into()));
            }
            LoadedSource {
                text: blog::fetch_blog_content(url).await?,
                ..Default::default()
            }
        }
        SummarySource::BlogText(text) => LoadedSource {
            text: text.clone(),
            ..Default::default()
        },
        SummarySource::YouTube(url) => {
            let id = youtube::extract_video_id(url)?;
            let text = youtube::fetch_transcript(&settings.youtube_base_url, &id).await?;
            LoadedSource {
                text,
                video_embed_url: Some(youtube::embed_url(&id)),
                ..Default::default()
            }
        }
    };

    if loaded.text.trim().is_empty() {
        return Err(AppError::NoDocuments);
    }
    Ok(loaded)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    #[default]
    MapReduce,
    Stuff,
    Refine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryOptions {
    pub preset: ModelPreset,
    pub chain: ChainType,
    pub chunk_size: usize,
    pub overlap: usize,
    pub temperature: f32,
    pub num_summaries: u32,
    /// Combine prompt for map-reduce.
    pub prompt: String,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            preset: ModelPreset::default(),
            chain: ChainType::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            temperature: DEFAULT_TEMPERATURE,
            num_summaries: 1,
            prompt: DEFAULT_PROMPT.into(),
        }
    }
}

impl SummaryOptions {
    fn validate(&self) -> Result<TextSplitter> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(AppError::InvalidInput(
                "Temperature must be between 0 and 1.".into(),
            ));
        }
        if !(1..=MAX_SUMMARIES).contains(&self.num_summaries) {
            return Err(AppError::InvalidInput(format!(
                "Number of summaries must be between 1 and {MAX_SUMMARIES}."
            )));
        }
        Ok(TextSplitter::new(self.chunk_size, self.overlap)?.with_separator(' '))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResult {
    pub summaries: Vec<String>,
    pub notices: Vec<String>,
}

/// Run the chosen chain `num_summaries` times over `text`.
pub async fn summarize(settings: &Settings, text: &str, options: &SummaryOptions) -> Result<SummaryResult> {
    let splitter = options.validate()?;
    if text.trim().is_empty() {
        return Err(AppError::NoDocuments);
    }

    let resolved = settings.resolve_model(options.preset)?;
    let chunks = splitter.split(text);
    info!(
        chain = ?options.chain,
        chunks = chunks.len(),
        runs = options.num_summaries,
        model = %resolved.model,
        "summarizing"
    );

    let chain = Chain {
        provider: &resolved.provider,
        model: &resolved.model,
        temperature: options.temperature,
    };
    let mut summaries = Vec::with_capacity(options.num_summaries as usize);
    for run in 0..options.num_summaries {
        let summary = match options.chain {
            ChainType::Stuff => chain.stuff(&chunks).await?,
            ChainType::MapReduce => chain.map_reduce(&chunks, &options.prompt).await?,
            ChainType::Refine => chain.refine(&chunks).await?,
        };
        debug!(run, chars = summary.len(), "summary generated");
        summaries.push(summary.trim().to_string());
    }

    Ok(SummaryResult {
        summaries,
        notices: resolved.notice.into_iter().collect(),
    })
}

struct Chain<'a> {
    provider: &'a Provider,
    model: &'a str,
    temperature: f32,
}

impl Chain<'_> {
    async fn call(&self, prompt: String) -> Result<String> {
        let request = ChatRequest::prompt(self.model, prompt).temperature(self.temperature);
        Ok(self.provider.complete(&request).await?)
    }

    async fn stuff(&self, chunks: &[String]) -> Result<String> {
        self.call(STUFF_PROMPT.replace("{text}", &chunks.join("\n\n")))
            .await
    }

    async fn map_reduce(&self, chunks: &[String], prompt: &str) -> Result<String> {
        let mut partials = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            partials.push(self.call(MAP_PROMPT.replace("{text}", chunk)).await?);
        }
        self.call(combine_prompt(prompt, &partials)).await
    }

    async fn refine(&self, chunks: &[String]) -> Result<String> {
        let Some((first, rest)) = chunks.split_first() else {
            return Ok(String::new());
        };
        let mut summary = self.call(STUFF_PROMPT.replace("{text}", first)).await?;
        for chunk in rest {
            let prompt = REFINE_PROMPT
                .replace("{existing_answer}", &summary)
                .replace("{text}", chunk);
            summary = self.call(prompt).await?;
        }
        Ok(summary)
    }
}

fn combine_prompt(prompt: &str, partials: &[String]) -> String {
    let prompt = match prompt.trim() {
        "" => DEFAULT_PROMPT,
        p => p,
    };
    format!("{prompt}:\n {}", partials.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        let splitter = SummaryOptions::default().validate().unwrap();
        assert_eq!(splitter.chunk_size(), 2000);
        assert_eq!(splitter.overlap(), 200);
    }

    #[test]
    fn test_options_bounds() {
        let hot = SummaryOptions {
            temperature: 1.5,
            ..Default::default()
        };
        assert!(matches!(hot.validate(), Err(AppError::InvalidInput(_))));

        let many = SummaryOptions {
            num_summaries: 11,
            ..Default::default()
        };
        assert!(many.validate().is_err());

        let none = SummaryOptions {
            num_summaries: 0,
            ..Default::default()
        };
        assert!(none.validate().is_err());

        let overlap = SummaryOptions {
            chunk_size: 100,
            overlap: 100,
            ..Default::default()
        };
        assert!(overlap.validate().is_err());
    }

    #[test]
    fn test_combine_prompt() {
        let partials = vec!["one".to_string(), "two".to_string()];
        assert_eq!(combine_prompt("Summarize for a child", &partials), "Summarize for a child:\n one\n\ntwo");
        assert!(combine_prompt("  ", &partials).starts_with(DEFAULT_PROMPT));
    }

    #[test]
    fn test_source_deserializes_from_page() {
        let source: SummarySource =
            serde_json::from_str(r#"{"kind":"youtube","value":"https://youtu.be/dQw4w9WgXcQ"}"#).unwrap();
        assert!(matches!(source, SummarySource::YouTube(_)));
        let options: SummaryOptions = serde_json::from_str(r#"{"chain":"refine"}"#).unwrap();
        assert_eq!(options.chain, ChainType::Refine);
        assert_eq!(options.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn test_blank_text_source_is_rejected() {
        let settings = Settings::default();
        let err = load_source(&settings, &SummarySource::BlogText("  \n".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoDocuments));
    }

    #[tokio::test]
    async fn test_invalid_video_url_is_rejected() {
        let settings = Settings::default();
        let err = load_source(&settings, &SummarySource::YouTube("https://example.com".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch(_)));
    }
}
