use super::FetchError;
use crate::config::Settings;
use crate::error::AppError;
use reqwest::Client;
use serde::Deserialize;

#[derive(Deserialize)]
struct RandomPhoto {
    urls: PhotoUrls,
}

#[derive(Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
}

/// URL of a random stock photo matching `topic`.
pub async fn fetch_image_url(settings: &Settings, topic: &str) -> Result<String, AppError> {
    let key = settings.unsplash_key()?;
    let url = format!(
        "{}/photos/random",
        settings.unsplash_base_url.trim_end_matches('/')
    );

    let resp = Client::new()
        .get(&url)
        .query(&[("query", topic), ("client_id", key)])
        .send()
        .await
        .map_err(FetchError::from)?;
    if !resp.status().is_success() {
        return Err(FetchError::Status {
            url,
            status: resp.status().as_u16(),
        }
        .into());
    }

    let photo: RandomPhoto = resp.json().await.map_err(|e| FetchError::Parse {
        url: url.clone(),
        detail: e.to_string(),
    })?;
    photo
        .urls
        .regular
        .ok_or_else(|| FetchError::NoContent(format!("No photo found for '{topic}'")).into())
}
