use crate::llm::openai::{ensure_success, post, OpenAiConfig};
use crate::llm::LlmError;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
const BATCH_SIZE: usize = 20;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Generate embeddings for a list of texts using the OpenAI-compatible API
pub async fn generate_embeddings(
    config: &OpenAiConfig,
    texts: &[String],
    model: &str,
) -> Result<Vec<Vec<f32>>, LlmError> {
    let body = EmbeddingRequest { model, input: texts };

    let resp = post(config, "embeddings").json(&body).send().await?;
    let resp = ensure_success(resp).await?;

    let mut data: EmbeddingResponse = resp.json().await?;
    if data.data.len() != texts.len() {
        return Err(LlmError::Parse(format!(
            "expected {} embeddings, got {}",
            texts.len(),
            data.data.len()
        )));
    }
    data.data.sort_by_key(|d| d.index.unwrap_or(0));
    Ok(data.data.into_iter().map(|d| d.embedding).collect())
}

/// Embed every text, batching requests. Output order follows input order.
pub async fn embed_all(config: &OpenAiConfig, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(BATCH_SIZE) {
        debug!(batch = batch.len(), "requesting embeddings");
        out.extend(generate_embeddings(config, batch, EMBEDDING_MODEL).await?);
    }
    Ok(out)
}

/// Cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank candidates against a query embedding, best first.
pub fn search_similar<K: Clone>(
    query_embedding: &[f32],
    candidates: &[(K, Vec<f32>)],
    top_k: usize,
) -> Vec<(K, f32)> {
    let mut scored: Vec<(K, f32)> = candidates
        .iter()
        .map(|(key, emb)| (key.clone(), cosine_similarity(query_embedding, emb)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}

/// Serialize embedding to bytes for SQLite BLOB storage
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from SQLite BLOB bytes
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_similar_orders_and_truncates() {
        let candidates = vec![
            (0usize, vec![0.0, 1.0]),
            (1, vec![1.0, 0.1]),
            (2, vec![1.0, 0.0]),
        ];
        let hits = search_similar(&[1.0, 0.0], &candidates, 2);
        let keys: Vec<usize> = hits.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![2, 1]);
    }

    #[test]
    fn test_embedding_roundtrip() {
        let emb = vec![0.1, 0.2, -0.3, 0.4];
        let bytes = embedding_to_bytes(&emb);
        let back = bytes_to_embedding(&bytes);
        assert_eq!(emb, back);
    }
}
