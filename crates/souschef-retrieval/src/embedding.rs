use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A batch of embedding vectors, one per input text, in input order.
#[derive(Debug, Clone)]
pub struct Embeddings {
    pub vectors: Vec<Vec<f32>>,
    pub model: String,
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Embeddings>;
    fn model_id(&self) -> &str;
    fn dimensions(&self) -> usize;
    /// False for the hash stub, whose vectors carry no meaning.
    fn is_semantic(&self) -> bool {
        true
    }
}

/// OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimensions: usize,
    base_url: String,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
    encoding_format: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
    index: usize,
}

/// The API may return rows out of order; restore input order and
/// reject gaps or duplicates.
fn ordered_vectors(mut rows: Vec<EmbeddingRow>) -> Result<Vec<Vec<f32>>> {
    rows.sort_by_key(|row| row.index);
    for (expected, row) in rows.iter().enumerate() {
        if row.index != expected {
            return Err(anyhow!(
                "missing or duplicated embedding index: expected {expected}, got {}",
                row.index
            ));
        }
    }
    Ok(rows.into_iter().map(|row| row.embedding).collect())
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Embeddings> {
        if texts.is_empty() {
            return Ok(Embeddings {
                vectors: Vec::new(),
                model: self.model.clone(),
            });
        }

        let endpoint = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
            encoding_format: "float".to_string(),
        };

        let response = self
            .client
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let parsed: EmbeddingResponse = response.json().await?;
        let model = parsed.model;
        let vectors = ordered_vectors(parsed.data)?;

        if vectors.len() != texts.len() {
            return Err(anyhow!(
                "embedding count mismatch: expected {}, got {}",
                texts.len(),
                vectors.len()
            ));
        }

        Ok(Embeddings { vectors, model })
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Deterministic hash-derived vectors. Lets the index and its tests run
/// without network access.
#[derive(Clone)]
pub struct StubEmbeddingProvider {
    dims: usize,
}

impl StubEmbeddingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn component(text: &str, index: usize) -> f32 {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(index.to_le_bytes());
        let digest = hasher.finalize();
        let raw = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]);
        (raw as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Embeddings> {
        let vectors = texts
            .iter()
            .map(|text| (0..self.dims).map(|i| Self::component(text, i)).collect())
            .collect();
        Ok(Embeddings {
            vectors,
            model: "stub".to_string(),
        })
    }

    fn model_id(&self) -> &str {
        "stub"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn is_semantic(&self) -> bool {
        false
    }
}
