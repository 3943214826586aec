//! HTTP behavior of the OpenAI-compatible embedding provider against a
//! mock endpoint.

use serde_json::json;
use souschef_retrieval::{EmbeddingProvider, OpenAiEmbeddingProvider};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn embed_parses_vectors_in_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "text-embedding-3-small",
            "data": [
                {"index": 1, "embedding": [0.4, 0.5]},
                {"index": 0, "embedding": [0.1, 0.2]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiEmbeddingProvider::new("sk-test").with_base_url(server.uri());
    let texts = vec!["番茄炒蛋".to_string(), "麻婆豆腐".to_string()];
    let result = provider.embed(&texts).await.unwrap();

    assert_eq!(result.model, "text-embedding-3-small");
    assert_eq!(result.vectors, vec![vec![0.1, 0.2], vec![0.4, 0.5]]);
}

#[tokio::test]
async fn embed_empty_input_skips_request() {
    let server = MockServer::start().await;
    // No mock mounted: a request would 404 and fail the call.
    let provider = OpenAiEmbeddingProvider::new("sk-test").with_base_url(server.uri());
    let result = provider.embed(&[]).await.unwrap();
    assert!(result.vectors.is_empty());
}

#[tokio::test]
async fn embed_errors_on_server_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = OpenAiEmbeddingProvider::new("sk-test").with_base_url(server.uri());
    assert!(provider.embed(&["豆腐".to_string()]).await.is_err());
}

#[tokio::test]
async fn embed_errors_on_count_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "text-embedding-3-small",
            "data": [{"index": 0, "embedding": [0.1]}]
        })))
        .mount(&server)
        .await;

    let provider = OpenAiEmbeddingProvider::new("sk-test").with_base_url(server.uri());
    let texts = vec!["a".to_string(), "b".to_string()];
    let err = provider.embed(&texts).await.unwrap_err();
    assert!(err.to_string().contains("mismatch"));
}
