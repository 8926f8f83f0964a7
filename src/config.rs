//! Process-wide settings, read from the environment once at startup.
//!
//! A missing key never fails startup. The page that first needs it gets a
//! [`ConfigError::MissingCredential`] instead.

use crate::llm::openai::OpenAiConfig;
use crate::llm::{ModelPreset, Provider, ResolvedModel};
use serde::Serialize;
use std::path::PathBuf;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_UNSPLASH_BASE_URL: &str = "https://api.unsplash.com";
pub const DEFAULT_YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

const OPEN_SOURCE_FALLBACK: &str = "Using ChatGPT while open source models are not implemented!";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not configured. Add it to the environment or a .env file.")]
    MissingCredential(&'static str),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub unsplash_access_key: Option<String>,
    pub unsplash_base_url: String,
    pub youtube_base_url: String,
    pub ollama_host: Option<String>,
    pub artifact_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.into(),
            unsplash_access_key: None,
            unsplash_base_url: DEFAULT_UNSPLASH_BASE_URL.into(),
            youtube_base_url: DEFAULT_YOUTUBE_BASE_URL.into(),
            ollama_host: None,
            artifact_dir: None,
        }
    }
}

/// One row of the read-only settings view.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SettingStatus {
    pub key: &'static str,
    pub value: Option<String>,
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            unsplash_access_key: get("UNSPLASH_ACCESS_KEY"),
            unsplash_base_url: get("UNSPLASH_BASE_URL").unwrap_or(defaults.unsplash_base_url),
            youtube_base_url: get("YOUTUBE_BASE_URL").unwrap_or(defaults.youtube_base_url),
            ollama_host: get("OLLAMA_HOST"),
            artifact_dir: get("STUDY_BOX_ARTIFACT_DIR").map(PathBuf::from),
        }
    }

    pub fn openai(&self) -> Result<OpenAiConfig, ConfigError> {
        let api_key = self
            .openai_api_key
            .clone()
            .ok_or(ConfigError::MissingCredential("OPENAI_API_KEY"))?;
        Ok(OpenAiConfig {
            api_key,
            base_url: self.openai_base_url.clone(),
        })
    }

    pub fn unsplash_key(&self) -> Result<&str, ConfigError> {
        self.unsplash_access_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("UNSPLASH_ACCESS_KEY"))
    }

    /// Map a preset onto a concrete provider and model id.
    pub fn resolve_model(&self, preset: ModelPreset) -> Result<ResolvedModel, ConfigError> {
        if preset == ModelPreset::OpenSource {
            if let Some(host) = &self.ollama_host {
                return Ok(ResolvedModel {
                    provider: Provider::ollama(host),
                    model: preset.model_id().into(),
                    notice: None,
                });
            }
        }

        let config = self.openai()?;
        let (model, notice) = match preset {
            ModelPreset::OpenSource => (
                ModelPreset::ChatGpt.model_id(),
                Some(OPEN_SOURCE_FALLBACK.to_string()),
            ),
            other => (other.model_id(), None),
        };
        Ok(ResolvedModel {
            provider: Provider::OpenAi(config),
            model: model.into(),
            notice,
        })
    }

    /// Presets usable with the current configuration.
    pub fn available_presets(&self) -> Vec<ModelPreset> {
        ModelPreset::ALL
            .into_iter()
            .filter(|p| match p {
                ModelPreset::OpenSource => self.ollama_host.is_some() || self.openai_api_key.is_some(),
                _ => self.openai_api_key.is_some(),
            })
            .collect()
    }

    /// Settings for display, with credentials masked.
    pub fn status(&self) -> Vec<SettingStatus> {
        vec![
            SettingStatus {
                key: "OPENAI_API_KEY",
                value: self.openai_api_key.as_deref().map(mask_secret),
            },
            SettingStatus {
                key: "OPENAI_BASE_URL",
                value: Some(self.openai_base_url.clone()),
            },
            SettingStatus {
                key: "UNSPLASH_ACCESS_KEY",
                value: self.unsplash_access_key.as_deref().map(mask_secret),
            },
            SettingStatus {
                key: "OLLAMA_HOST",
                value: self.ollama_host.clone(),
            },
            SettingStatus {
                key: "STUDY_BOX_ARTIFACT_DIR",
                value: self.artifact_dir.as_ref().map(|p| p.display().to_string()),
            },
        ]
    }
}

/// Keep the first and last four characters of long secrets.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".into()
    }
}
