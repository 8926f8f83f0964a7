use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A file handed in by the user, held only for one interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let bytes = fs::read(path).map_err(|e| ExtractError::Read {
            file: file_name.clone(),
            detail: e.to_string(),
        })?;
        Ok(Self { file_name, bytes })
    }

    fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
    }
}

/// Parsed document content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub file_name: String,
    pub file_type: String,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported file type: .{ext} ({file})")]
    Unsupported { file: String, ext: String },
    #[error("'{file}' is not a PDF file")]
    NotAPdf { file: String },
    #[error("PDF parse error in '{file}': {detail}")]
    Pdf { file: String, detail: String },
    #[error("'{file}' is not valid UTF-8 text")]
    NotUtf8 { file: String },
    #[error("Could not read '{file}': {detail}")]
    Read { file: String, detail: String },
}

/// Parse an uploaded file into plain text
pub fn parse_upload(upload: &Upload) -> Result<ParsedDocument, ExtractError> {
    let ext = upload.extension();

    let (content, file_type) = match ext.as_str() {
        "txt" => (decode_utf8(upload)?, "txt"),
        "md" | "markdown" => (decode_utf8(upload)?, "md"),
        "pdf" => (extract_pdf(upload)?, "pdf"),
        _ => {
            return Err(ExtractError::Unsupported {
                file: upload.file_name.clone(),
                ext,
            })
        }
    };

    if content.trim().is_empty() {
        warn!(
            file = %upload.file_name,
            "no text could be extracted; the file may be image-only"
        );
    }
    debug!(file = %upload.file_name, chars = content.chars().count(), "document parsed");

    Ok(ParsedDocument {
        file_name: upload.file_name.clone(),
        file_type: file_type.into(),
        content,
    })
}

fn decode_utf8(upload: &Upload) -> Result<String, ExtractError> {
    String::from_utf8(upload.bytes.clone()).map_err(|_| ExtractError::NotUtf8 {
        file: upload.file_name.clone(),
    })
}

fn extract_pdf(upload: &Upload) -> Result<String, ExtractError> {
    if !upload.bytes.starts_with(b"%PDF-") {
        return Err(ExtractError::NotAPdf {
            file: upload.file_name.clone(),
        });
    }

    // pdf-extract panics on some malformed inputs instead of returning Err.
    let bytes = upload.bytes.as_slice();
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractError::Pdf {
            file: upload.file_name.clone(),
            detail: e.to_string(),
        }),
        Err(_) => Err(ExtractError::Pdf {
            file: upload.file_name.clone(),
            detail: "parser aborted on malformed content".into(),
        }),
    }
}

/// Parse every upload, keeping upload order. The first failure aborts.
pub fn extract_each(uploads: &[Upload]) -> Result<Vec<ParsedDocument>, AppError> {
    if uploads.is_empty() {
        return Err(AppError::NoDocuments);
    }
    uploads
        .iter()
        .map(|u| parse_upload(u).map_err(AppError::from))
        .collect()
}

/// Parse every upload and join the texts with `separator`.
pub fn extract_combined(uploads: &[Upload], separator: &str) -> Result<String, AppError> {
    let docs = extract_each(uploads)?;
    Ok(docs
        .into_iter()
        .map(|d| d.content)
        .collect::<Vec<_>>()
        .join(separator))
}

/// `data:` URI for embedding an uploaded PDF in a page.
pub fn pdf_preview_data_uri(bytes: &[u8]) -> String {
    format!("data:application/pdf;base64,{}", STANDARD.encode(bytes))
}

/// Fixed-size splitter with overlap, measured in characters.
///
/// Each chunk after the first starts with exactly the last `overlap`
/// characters of the previous one, so dropping those prefixes and
/// concatenating yields the original text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
    separator: Option<char>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, AppError> {
        if chunk_size == 0 {
            return Err(AppError::InvalidInput("chunk size must be positive".into()));
        }
        if overlap >= chunk_size {
            return Err(AppError::InvalidInput(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
            separator: None,
        })
    }

    /// Prefer to end chunks right after `separator`.
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = Some(separator);
        self
    }

    /// Line-aware 1000/200 split used to build the chat index.
    pub fn chat() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
            separator: Some('\n'),
        }
    }

    /// Word-aware split sized for one speech request.
    pub fn speech() -> Self {
        Self {
            chunk_size: crate::llm::openai::SPEECH_MAX_CHARS,
            overlap: 0,
            separator: Some(' '),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        if len == 0 {
            return chunks;
        }

        let mut start = 0;
        loop {
            let hard_end = (start + self.chunk_size).min(len);
            let end = if hard_end == len {
                len
            } else {
                self.break_point(&chars, start, hard_end)
            };
            chunks.push(chars[start..end].iter().collect());
            if end == len {
                break;
            }
            // end - start > overlap always holds, so this advances.
            start = end - self.overlap;
        }

        chunks
    }

    fn break_point(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        let Some(sep) = self.separator else {
            return hard_end;
        };
        chars[start..hard_end]
            .iter()
            .rposition(|&c| c == sep)
            .map(|i| start + i + 1)
            .filter(|&end| end - start > self.overlap)
            .unwrap_or(hard_end)
    }
}
