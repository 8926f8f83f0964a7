//! Error types shared by every page.
//!
//! Each concern has its own enum ([`ExtractError`], [`LlmError`],
//! [`FetchError`], [`ConfigError`], [`SessionError`], [`PptxError`]);
//! [`AppError`] gathers them at the command boundary. None of them is retried. A command that
//! fails returns the error's display text, which the page shows inline.

use serde::Serialize;

pub use crate::config::ConfigError;
pub use crate::doc_processor::ExtractError;
pub use crate::llm::LlmError;
pub use crate::pptx::PptxError;
pub use crate::session::SessionError;
pub use crate::sources::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Please upload at least one file.")]
    NoDocuments,
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Pptx(#[from] PptxError),
    #[error("Artifact error: {0}")]
    Io(#[from] std::io::Error),
    /// Window, dialog or opener failure in the desktop shell.
    #[error("{0}")]
    Desktop(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_documents_message() {
        assert_eq!(AppError::NoDocuments.to_string(), "Please upload at least one file.");
    }

    #[test]
    fn missing_credential_is_transparent() {
        let e = AppError::from(ConfigError::MissingCredential("OPENAI_API_KEY"));
        assert!(e.to_string().contains("OPENAI_API_KEY"), "got: {e}");
    }

    #[test]
    fn serializes_as_display_string() {
        let e = AppError::from(LlmError::Api {
            status: 429,
            message: "quota exceeded".into(),
        });
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, "\"API error: 429 - quota exceeded\"");
    }
}
