pub mod openai;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Single user turn, the shape every one-shot page prompt uses.
    pub fn prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(model, vec![ChatMessage::user(prompt)])
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
}

/// Named model choices offered by the pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelPreset {
    #[default]
    ChatGpt,
    Gpt4,
    /// Local OpenAI-compatible server; falls back to `ChatGpt` when none is configured.
    OpenSource,
}

impl ModelPreset {
    pub const ALL: [ModelPreset; 3] = [
        ModelPreset::ChatGpt,
        ModelPreset::Gpt4,
        ModelPreset::OpenSource,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ModelPreset::ChatGpt => "ChatGPT",
            ModelPreset::Gpt4 => "GPT4",
            ModelPreset::OpenSource => "Other (open source)",
        }
    }

    pub fn model_id(self) -> &'static str {
        match self {
            ModelPreset::ChatGpt => "gpt-3.5-turbo",
            ModelPreset::Gpt4 => "gpt-4",
            ModelPreset::OpenSource => "llama3",
        }
    }

    pub fn info(self) -> ModelInfo {
        let provider = match self {
            ModelPreset::OpenSource => "Ollama",
            _ => "OpenAI",
        };
        ModelInfo {
            id: serde_json::to_value(self)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default(),
            name: self.label().into(),
            provider: provider.into(),
        }
    }
}

/// OpenAI or any server speaking the same chat-completions dialect.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAi(openai::OpenAiConfig),
    Ollama(openai::OpenAiConfig),
}

impl Provider {
    pub fn ollama(host: &str) -> Self {
        Provider::Ollama(openai::OpenAiConfig {
            api_key: String::new(),
            base_url: format!("{}/v1", host.trim_end_matches('/')),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi(_) => "openai",
            Provider::Ollama(_) => "ollama",
        }
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        match self {
            Provider::OpenAi(config) | Provider::Ollama(config) => {
                openai::chat(config, request).await
            }
        }
    }

    /// Convenience for one-shot prompts: send and return only the text.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        Ok(self.chat(request).await?.content)
    }
}

/// A preset resolved against the configured credentials.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub provider: Provider,
    pub model: String,
    /// Shown to the user when the preset could not be honoured as asked.
    pub notice: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Write error: {0}")]
    Io(#[from] std::io::Error),
}
