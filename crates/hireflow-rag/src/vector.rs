//! Vector similarity search over stored chunks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use hireflow_core::UserId;
use hireflow_store::{DocumentChunk, Store};

use crate::error::Result;

/// Minimum cosine similarity for a chunk to be returned.
pub const SIMILARITY_THRESHOLD: f32 = 0.5;

/// A chunk together with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    /// The matching chunk.
    pub chunk: DocumentChunk,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

/// Stores chunk embeddings and answers similarity queries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunks in one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be written; nothing is inserted then.
    async fn add_documents(&self, chunks: &[DocumentChunk]) -> Result<()>;

    /// Return at most `k` of the user's chunks closest to `embedding`,
    /// best first.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage fails.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
        user_id: &UserId,
    ) -> Result<Vec<ScoredChunk>>;
}

/// Cosine similarity of two vectors.
///
/// Returns `None` when the lengths differ or either vector has zero norm.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    (denom > 0.0).then(|| dot / denom)
}

/// Brute-force vector index over the chunk column families.
pub struct StoreVectorIndex {
    store: Arc<dyn Store>,
}

impl StoreVectorIndex {
    /// Create an index backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl VectorStore for StoreVectorIndex {
    async fn add_documents(&self, chunks: &[DocumentChunk]) -> Result<()> {
        self.store.put_chunks(chunks)?;
        Ok(())
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
        user_id: &UserId,
    ) -> Result<Vec<ScoredChunk>> {
        let chunks = self.store.list_chunks_by_user(user_id)?;
        let scanned = chunks.len();

        let mut scored: Vec<ScoredChunk> = chunks
            .into_iter()
            .filter_map(|chunk| {
                let score = cosine_similarity(chunk.embedding.as_deref()?, embedding)?;
                (score >= SIMILARITY_THRESHOLD).then_some(ScoredChunk { chunk, score })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        tracing::debug!(
            user_id = %user_id,
            scanned,
            matched = scored.len(),
            "Similarity search"
        );
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hireflow_core::{ChunkId, DocumentId};
    use hireflow_store::{ChunkMetadata, RocksStore};
    use tempfile::TempDir;

    fn create_test_index() -> (StoreVectorIndex, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (StoreVectorIndex::new(Arc::new(store)), dir)
    }

    fn chunk(user_id: UserId, index: u32, embedding: Option<Vec<f32>>) -> DocumentChunk {
        DocumentChunk {
            chunk_id: ChunkId::generate(),
            document_id: DocumentId::generate(),
            user_id,
            content: format!("chunk {index}"),
            embedding,
            metadata: ChunkMetadata::default(),
            chunk_index: index,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
    }

    #[tokio::test]
    async fn search_filters_sorts_and_truncates() {
        let (index, _dir) = create_test_index();
        let user_id = UserId::from_bytes([1u8; 32]);

        index
            .add_documents(&[
                chunk(user_id, 0, Some(vec![1.0, 0.0])),
                chunk(user_id, 1, Some(vec![0.8, 0.6])),
                chunk(user_id, 2, Some(vec![0.0, 1.0])),
                chunk(user_id, 3, Some(vec![0.6, 0.8])),
                chunk(user_id, 4, None),
                chunk(user_id, 5, Some(vec![1.0, 0.0, 0.0])),
            ])
            .await
            .unwrap();

        let results = index.similarity_search(&[1.0, 0.0], 2, &user_id).await.unwrap();

        let indexes: Vec<u32> = results.iter().map(|r| r.chunk.chunk_index).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn search_drops_scores_below_threshold() {
        let (index, _dir) = create_test_index();
        let user_id = UserId::from_bytes([1u8; 32]);

        index
            .add_documents(&[chunk(user_id, 0, Some(vec![0.0, 1.0]))])
            .await
            .unwrap();

        let results = index.similarity_search(&[1.0, 0.0], 5, &user_id).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_is_scoped_to_user() {
        let (index, _dir) = create_test_index();
        let alice = UserId::from_bytes([1u8; 32]);
        let bob = UserId::from_bytes([2u8; 32]);

        index
            .add_documents(&[chunk(alice, 0, Some(vec![1.0, 0.0]))])
            .await
            .unwrap();

        assert!(index
            .similarity_search(&[1.0, 0.0], 5, &bob)
            .await
            .unwrap()
            .is_empty());
    }
}
