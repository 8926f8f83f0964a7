//! Remote inputs that are not model calls: web pages, video transcripts and
//! photo search.

pub mod blog;
pub mod unsplash;
pub mod youtube;

use reqwest::{Client, Response};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request to '{url}' failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("Invalid YouTube URL: '{0}'")]
    InvalidVideoUrl(String),
    #[error("{0}")]
    NoContent(String),
    #[error("Could not parse response from '{url}': {detail}")]
    Parse { url: String, detail: String },
}

/// GET `url` and fail on any non-success status.
pub(crate) async fn get(url: &str) -> Result<Response, FetchError> {
    let resp = Client::new().get(url).send().await?;
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: resp.status().as_u16(),
        });
    }
    Ok(resp)
}

/// Download raw bytes, e.g. a generated cover image or a stock photo.
pub async fn download(url: &str) -> Result<Vec<u8>, FetchError> {
    let resp = get(url).await?;
    Ok(resp.bytes().await?.to_vec())
}
