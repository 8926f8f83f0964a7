//! Fake remote services and fixtures shared by the pipeline tests.
#![allow(dead_code)]

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use study_box_lib::config::Settings;

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";
const VOCABULARY: [&str; 5] = ["mitochondria", "powerhouse", "photosynthesis", "chloroplast", "membrane"];

#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub body: Value,
}

/// OpenAI, Unsplash, YouTube and a blog, all on one local port.
#[derive(Clone)]
pub struct FakeServer {
    pub base: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl FakeServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = FakeServer {
            base: format!("http://{addr}"),
            hits: Arc::default(),
        };

        let app = Router::new()
            .route("/v1/chat/completions", post(chat))
            .route("/v1/embeddings", post(embeddings))
            .route("/v1/images/generations", post(images))
            .route("/v1/audio/speech", post(speech))
            .route("/photos/random", get(random_photo))
            .route("/files/picture.png", get(picture))
            .route("/watch", get(watch_page))
            .route("/api/timedtext", get(timed_text))
            .route("/blog", get(blog))
            .with_state(server.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        server
    }

    pub fn settings(&self) -> Settings {
        Settings {
            openai_api_key: Some("sk-test-key".into()),
            openai_base_url: format!("{}/v1", self.base),
            unsplash_access_key: Some("unsplash-test".into()),
            unsplash_base_url: self.base.clone(),
            youtube_base_url: self.base.clone(),
            ..Settings::default()
        }
    }

    fn record(&self, path: impl Into<String>, body: Value) {
        self.hits.lock().unwrap().push(Hit {
            path: path.into(),
            body,
        });
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn total(&self) -> usize {
        self.hits.lock().unwrap().len()
    }

    /// Requests whose path starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.hits().iter().filter(|h| h.path.starts_with(prefix)).count()
    }

    /// Last user message of every chat completion, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.hits()
            .iter()
            .filter(|h| h.path == "/v1/chat/completions")
            .map(|h| last_message(&h.body))
            .collect()
    }
}

fn last_message(body: &Value) -> String {
    body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string()
}

/// Canned completions keyed on the prompt wording.
fn completion(prompt: &str, nth: usize) -> Option<String> {
    if prompt.contains("Generate 10 slide titles") {
        return Some("1. Intro\n\n2. Structure\n3. Function".into());
    }
    if prompt.contains("Generate content for the slide") {
        if prompt.contains("Structure") {
            return None;
        }
        return Some("- first point\n- second point".into());
    }
    if prompt.contains("Standalone question:") {
        return Some("What is the powerhouse of the cell?".into());
    }
    if prompt.contains("Helpful Answer:") {
        let answer = prompt
            .lines()
            .find(|l| l.contains("powerhouse") && !l.starts_with("Question:"))
            .map(str::trim)
            .unwrap_or("I don't know.");
        return Some(answer.to_string());
    }
    if prompt.contains("multiple-choice") {
        return Some("- Question: What makes ATP?\na. Ribosome\nb. Mitochondria [Correct Answer]\nc. Nucleus\nd. Golgi".into());
    }
    if prompt.contains("flashcards") {
        return Some("- Q: What makes ATP?\n- A: Mitochondria".into());
    }
    Some(format!("summary {nth}"))
}

/// Prompts containing this word are answered after [`SLOW_REPLY`].
pub const SLOW_MARKER: &str = "slowly";
pub const SLOW_REPLY: std::time::Duration = std::time::Duration::from_millis(500);

async fn chat(State(server): State<FakeServer>, Json(body): Json<Value>) -> Response {
    let prompt = last_message(&body);
    server.record("/v1/chat/completions", body);
    if prompt.contains(SLOW_MARKER) {
        tokio::time::sleep(SLOW_REPLY).await;
    }
    match completion(&prompt, server.count("/v1/chat/completions")) {
        Some(content) => Json(json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        }))
        .into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "model overloaded").into_response(),
    }
}

/// Bag-of-words vectors over a tiny vocabulary.
pub fn fake_embedding(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = VOCABULARY
        .iter()
        .map(|w| lower.matches(w).count() as f32)
        .collect();
    v.push(0.01);
    v
}

async fn embeddings(State(server): State<FakeServer>, Json(body): Json<Value>) -> Json<Value> {
    let inputs: Vec<String> = body["input"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    server.record("/v1/embeddings", body);
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .map(|(i, t)| json!({"index": i, "embedding": fake_embedding(t)}))
        .collect();
    Json(json!({ "data": data }))
}

async fn images(State(server): State<FakeServer>, Json(body): Json<Value>) -> Json<Value> {
    server.record("/v1/images/generations", body);
    Json(json!({"data": [{"url": format!("{}/files/picture.png", server.base)}]}))
}

async fn speech(State(server): State<FakeServer>, Json(body): Json<Value>) -> Response {
    let len = body["input"].as_str().map(|s| s.chars().count()).unwrap_or(0);
    server.record("/v1/audio/speech", body);
    ([(header::CONTENT_TYPE, "audio/mpeg")], format!("ID3:{len}|")).into_response()
}

async fn random_photo(State(server): State<FakeServer>, uri: Uri) -> Json<Value> {
    server.record(uri.to_string(), Value::Null);
    Json(json!({"urls": {"regular": format!("{}/files/picture.png", server.base)}}))
}

async fn picture(State(server): State<FakeServer>, uri: Uri) -> Response {
    server.record(uri.to_string(), Value::Null);
    ([(header::CONTENT_TYPE, "image/png")], png(16, 9)).into_response()
}

async fn watch_page(State(server): State<FakeServer>, uri: Uri) -> String {
    server.record(uri.to_string(), Value::Null);
    format!(
        r#"<html><script>var ytInitialPlayerResponse = {{"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":[{{"baseUrl":"/api/timedtext?v={VIDEO_ID}&lang=en","languageCode":"en"}}]}}}}}};</script></html>"#
    )
}

async fn timed_text(State(server): State<FakeServer>, uri: Uri) -> String {
    server.record(uri.to_string(), Value::Null);
    r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0" dur="2">Cells are the unit of life</text><text start="2" dur="2">They divide &amp;amp; grow</text></transcript>"#.into()
}

async fn blog(State(server): State<FakeServer>, uri: Uri) -> String {
    server.record(uri.to_string(), Value::Null);
    "<html><body><h1>Post</h1><p>Membranes separate the cell.</p><p>Ribosomes build proteins.</p></body></html>".into()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A PDF with one line of Helvetica text per page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..pages.len())
                .map(|i| format!("{} 0 R", 4 + 2 * i))
                .collect::<Vec<_>>()
                .join(" "),
            pages.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        let escaped = text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)");
        let content = format!("BT /F1 12 Tf 72 720 Td ({escaped}) Tj ET");
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{object}\nendobj\n", i + 1).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    out
}
