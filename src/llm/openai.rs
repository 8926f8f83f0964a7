use super::{ChatMessage, ChatRequest, ChatResponse, LlmError};
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const IMAGE_SIZE: &str = "1024x1024";
pub const SPEECH_MODEL: &str = "tts-1";
pub const SPEECH_VOICE: &str = "alloy";
/// The speech endpoint rejects longer inputs.
pub const SPEECH_MAX_CHARS: usize = 4096;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

pub(crate) fn post(config: &OpenAiConfig, path: &str) -> RequestBuilder {
    let client = Client::new();
    let mut req = client
        .post(format!("{}/{}", config.base_url.trim_end_matches('/'), path))
        .header("Content-Type", "application/json");

    if !config.api_key.is_empty() {
        req = req.header("Authorization", format!("Bearer {}", config.api_key));
    }
    req
}

pub(crate) async fn ensure_success(resp: Response) -> Result<Response, LlmError> {
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            status,
            message: text,
        });
    }
    Ok(resp)
}

pub async fn chat(config: &OpenAiConfig, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
    let body = OpenAiRequest {
        model: &request.model,
        messages: &request.messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };

    let resp = post(config, "chat/completions").json(&body).send().await?;
    let resp = ensure_success(resp).await?;

    let data: OpenAiResponse = resp.json().await?;
    let content = data
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::Parse("completion returned no choices".into()))?;

    Ok(ChatResponse {
        content,
        model: request.model.clone(),
    })
}

/// Generate one square image and return the hosted URL.
pub async fn generate_image(config: &OpenAiConfig, prompt: &str) -> Result<String, LlmError> {
    let body = ImageRequest {
        prompt,
        n: 1,
        size: IMAGE_SIZE,
    };

    let resp = post(config, "images/generations").json(&body).send().await?;
    let resp = ensure_success(resp).await?;

    let data: ImageResponse = resp.json().await?;
    data.data
        .into_iter()
        .find_map(|d| d.url)
        .ok_or_else(|| LlmError::Parse("image response carried no url".into()))
}

/// Synthesize `text` as MP3 and stream the audio into `out`.
///
/// Returns the number of bytes written.
pub async fn synthesize_speech<W>(
    config: &OpenAiConfig,
    text: &str,
    out: &mut W,
) -> Result<u64, LlmError>
where
    W: AsyncWrite + Unpin,
{
    let body = SpeechRequest {
        model: SPEECH_MODEL,
        input: text,
        voice: SPEECH_VOICE,
        response_format: "mp3",
    };

    let resp = post(config, "audio/speech").json(&body).send().await?;
    let resp = ensure_success(resp).await?;

    let mut written = 0u64;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        out.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    out.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_unset_options() {
        let messages = vec![ChatMessage::user("hello")];
        let body = OpenAiRequest {
            model: "gpt-4",
            messages: &messages,
            temperature: None,
            max_tokens: Some(100),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("temperature").is_none());
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_with_null_content_parses() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let data: OpenAiResponse = serde_json::from_str(raw).unwrap();
        assert!(data.choices[0].message.content.is_none());
    }
}
