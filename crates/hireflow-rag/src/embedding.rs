//! Embedding providers.
//!
//! Each provider is one [`Embedder`] implementation talking to the vendor's
//! REST API directly. Failures surface as [`RagError::Embedding`] carrying the
//! provider's response; nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default OpenAI-compatible API base.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Gemini API base.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Turns text into embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a search query.
    ///
    /// # Errors
    ///
    /// Returns `Embedding` if the provider call fails.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of documents, one vector per input in input order.
    ///
    /// # Errors
    ///
    /// Returns `Embedding` if the provider call fails.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Connection settings shared by the HTTP embedders.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// API base URL without trailing slash.
    pub base_url: String,
    /// API key.
    pub api_key: String,
    /// Embedding model name.
    pub model: String,
}

impl EmbeddingConfig {
    /// Create a configuration.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .expect("failed to create HTTP client")
}

/// Send a request and decode the JSON body, mapping every failure to
/// `RagError::Embedding`.
async fn send_json<T: for<'de> Deserialize<'de>>(request: reqwest::RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| RagError::Embedding(format!("request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RagError::Embedding(format!("HTTP {status}: {body}")));
    }

    response
        .json()
        .await
        .map_err(|e| RagError::Embedding(format!("invalid response: {e}")))
}

// =============================================================================
// OpenAI
// =============================================================================

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
    index: usize,
}

/// Embedder for the OpenAI `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

impl OpenAiEmbedder {
    /// Create a new embedder.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with default TLS).
    #[must_use]
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            client: http_client(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| RagError::Embedding("empty embedding response".to_string()))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.config.base_url);
        tracing::debug!(model = %self.config.model, count = texts.len(), "Requesting embeddings");

        let response: OpenAiResponse = send_json(
            self.client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&OpenAiRequest {
                    model: &self.config.model,
                    input: texts,
                }),
        )
        .await?;

        if response.data.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        let mut data = response.data;
        data.sort_by_key(|e| e.index);
        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}

// =============================================================================
// Gemini
// =============================================================================

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiEmbedRequest<'a> {
    model: String,
    content: GeminiContent<'a>,
}

#[derive(Serialize)]
struct GeminiBatchRequest<'a> {
    requests: Vec<GeminiEmbedRequest<'a>>,
}

#[derive(Deserialize)]
struct GeminiValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct GeminiEmbedResponse {
    embedding: GeminiValues,
}

#[derive(Deserialize)]
struct GeminiBatchResponse {
    embeddings: Vec<GeminiValues>,
}

/// Embedder for the Gemini `embedContent` endpoints.
pub struct GeminiEmbedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

impl GeminiEmbedder {
    /// Create a new embedder.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with default TLS).
    #[must_use]
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            client: http_client(),
        }
    }

    fn request<'a>(&self, text: &'a str) -> GeminiEmbedRequest<'a> {
        GeminiEmbedRequest {
            model: format!("models/{}", self.config.model),
            content: GeminiContent {
                parts: [GeminiPart { text }],
            },
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "{}/models/{}:embedContent",
            self.config.base_url, self.config.model
        );

        let response: GeminiEmbedResponse = send_json(
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.config.api_key)
                .json(&self.request(text)),
        )
        .await?;

        Ok(response.embedding.values)
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/models/{}:batchEmbedContents",
            self.config.base_url, self.config.model
        );
        tracing::debug!(model = %self.config.model, count = texts.len(), "Requesting embeddings");

        let body = GeminiBatchRequest {
            requests: texts.iter().map(|t| self.request(t)).collect(),
        };
        let response: GeminiBatchResponse = send_json(
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.config.api_key)
                .json(&body),
        )
        .await?;

        if response.embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings.into_iter().map(|e| e.values).collect())
    }
}

// =============================================================================
// Test double
// =============================================================================

/// A deterministic offline embedder for testing.
///
/// Words are hashed into a fixed number of buckets, so texts sharing words
/// score high under cosine similarity. Every call is counted.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct HashEmbedder {
    dimensions: usize,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl HashEmbedder {
    /// Create an embedder producing vectors of `dimensions` entries.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Number of `embed_query` and `embed_documents` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Embed one text without counting the call.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split_whitespace() {
            // FNV-1a
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                    (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
                });
            let bucket = usize::try_from(hash % self.dimensions as u64).unwrap_or(0);
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self.vector(text))
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn texts() -> Vec<String> {
        vec!["first".to_string(), "second".to_string()]
    }

    #[tokio::test]
    async fn openai_embeds_batch_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": ["first", "second"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "embedding": [0.0, 1.0], "index": 1 },
                    { "embedding": [1.0, 0.0], "index": 0 }
                ]
            })))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(EmbeddingConfig::new(
            server.uri(),
            "sk-test",
            "text-embedding-3-small",
        ));
        let vectors = embedder.embed_documents(&texts()).await.unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn openai_error_carries_provider_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let embedder = OpenAiEmbedder::new(EmbeddingConfig::new(server.uri(), "k", "m"));
        let result = embedder.embed_query("hello").await;

        assert!(matches!(result, Err(RagError::Embedding(msg)) if msg.contains("quota exceeded")));
    }

    #[tokio::test]
    async fn empty_batch_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let openai = OpenAiEmbedder::new(EmbeddingConfig::new(server.uri(), "k", "m"));
        let gemini = GeminiEmbedder::new(EmbeddingConfig::new(server.uri(), "k", "m"));

        assert!(openai.embed_documents(&[]).await.unwrap().is_empty());
        assert!(gemini.embed_documents(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn gemini_embeds_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:embedContent"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_partial_json(serde_json::json!({
                "content": { "parts": [{ "text": "hello" }] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embedding": { "values": [0.5, 0.5] }
            })))
            .mount(&server)
            .await;

        let embedder = GeminiEmbedder::new(EmbeddingConfig::new(
            server.uri(),
            "g-key",
            "text-embedding-004",
        ));

        assert_eq!(embedder.embed_query("hello").await.unwrap(), vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn gemini_embeds_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/text-embedding-004:batchEmbedContents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [{ "values": [1.0] }, { "values": [2.0] }]
            })))
            .mount(&server)
            .await;

        let embedder = GeminiEmbedder::new(EmbeddingConfig::new(
            server.uri(),
            "g-key",
            "text-embedding-004",
        ));
        let vectors = embedder.embed_documents(&texts()).await.unwrap();

        assert_eq!(vectors, vec![vec![1.0], vec![2.0]]);
    }

    #[tokio::test]
    async fn hash_embedder_counts_calls() {
        let embedder = HashEmbedder::default();
        assert_eq!(embedder.calls(), 0);

        let a = embedder.embed_query("rust engineer").await.unwrap();
        let b = embedder.vector("Rust   engineer");
        assert_eq!(a, b);
        assert_eq!(embedder.calls(), 1);
    }
}
