//! Retrieve the chunks most relevant to a query.

use std::sync::Arc;

use hireflow_core::UserId;

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector::{ScoredChunk, VectorStore};

/// Number of chunks returned when the caller does not ask for a count.
pub const DEFAULT_K: usize = 5;

/// Embeds a query and searches the caller's chunks.
pub struct RetrieveContext {
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorStore>,
}

impl RetrieveContext {
    /// Create the use case.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, vectors: Arc<dyn VectorStore>) -> Self {
        Self { embedder, vectors }
    }

    /// Return up to `k` chunks owned by `user_id` that match `query`.
    ///
    /// A blank query returns nothing without calling the embedder.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the search fails.
    pub async fn execute(&self, user_id: &UserId, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed_query(query).await?;
        self.vectors.similarity_search(&embedding, k, user_id).await
    }
}
