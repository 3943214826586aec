//! Semantic recipe retrieval: the external nearest-neighbor search
//! contract, plus a local sqlite-vec implementation of it.

pub mod embedding;
pub mod index;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

pub use embedding::{Embeddings, EmbeddingProvider, OpenAiEmbeddingProvider, StubEmbeddingProvider};
pub use index::RecipeVectorIndex;

/// One candidate from semantic search. `similarity` is in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub recipe_id: u32,
    pub similarity: f32,
}

/// Text query -> ranked candidate recipe ids. Callers treat any error
/// as "retriever unavailable" and switch to their fallback path.
#[async_trait]
pub trait SemanticRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>>;
}

/// Returns a fixed hit list regardless of query. Useful in tests and
/// when wiring an engine without a vector index.
pub struct StaticRetriever {
    hits: Vec<RetrievalHit>,
}

impl StaticRetriever {
    pub fn new(hits: Vec<RetrievalHit>) -> Self {
        Self { hits }
    }

    pub fn empty() -> Self {
        Self { hits: Vec::new() }
    }
}

#[async_trait]
impl SemanticRetriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
        Ok(self.hits.iter().take(k).cloned().collect())
    }
}

/// Always errors. Exercises the degraded ranking path in tests.
pub struct FailingRetriever;

#[async_trait]
impl SemanticRetriever for FailingRetriever {
    async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<RetrievalHit>> {
        Err(anyhow!("semantic retriever unavailable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_retriever_respects_k() {
        let retriever = StaticRetriever::new(vec![
            RetrievalHit { recipe_id: 1, similarity: 0.9 },
            RetrievalHit { recipe_id: 2, similarity: 0.8 },
            RetrievalHit { recipe_id: 3, similarity: 0.7 },
        ]);
        let hits = retriever.retrieve("anything", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].recipe_id, 1);
    }

    #[tokio::test]
    async fn static_retriever_empty() {
        let retriever = StaticRetriever::empty();
        assert!(retriever.retrieve("q", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_retriever_errors() {
        let err = FailingRetriever.retrieve("q", 5).await.unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }
}
