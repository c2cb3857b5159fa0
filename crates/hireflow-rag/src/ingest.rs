//! Document ingestion use cases.
//!
//! Upload stores the raw file first and records the document, then tries to
//! index its text. Indexing failures are recorded on the document instead of
//! undoing the upload.

use std::sync::Arc;

use chrono::Utc;

use hireflow_core::{ChunkId, DocumentId, UserId};
use hireflow_store::{
    ChunkMetadata, Document, DocumentCategory, DocumentChunk, ProcessingStatus, Store,
};

use crate::blob::{sanitize_file_name, BlobStorage};
use crate::chunker::TextSplitter;
use crate::embedding::Embedder;
use crate::error::{RagError, Result};
use crate::extract::TextExtractor;
use crate::vector::VectorStore;

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as sent by the client.
    pub file_name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Raw contents.
    pub bytes: Vec<u8>,
}

/// Load a document and check the caller owns it.
fn load_owned(store: &dyn Store, user_id: &UserId, document_id: &DocumentId) -> Result<Document> {
    let document = store
        .get_document(document_id)?
        .ok_or(RagError::DocumentNotFound(*document_id))?;

    if document.user_id != *user_id {
        return Err(RagError::NotOwner {
            user_id: *user_id,
            document_id: *document_id,
        });
    }

    Ok(document)
}

/// Stores an upload and indexes its text.
pub struct UploadDocument {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStorage>,
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn Embedder>,
    vectors: Arc<dyn VectorStore>,
    splitter: TextSplitter,
}

/// What indexing did with a document's text.
enum Indexed {
    Chunks(u32),
    Skipped,
}

impl UploadDocument {
    /// Create the use case.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        blobs: Arc<dyn BlobStorage>,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn Embedder>,
        vectors: Arc<dyn VectorStore>,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            store,
            blobs,
            extractor,
            embedder,
            vectors,
            splitter,
        }
    }

    /// Store `file` for `user_id` and index its text.
    ///
    /// The returned document reflects the final processing status.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty file, or an error if the blob or
    /// the document record cannot be written. Indexing errors are not
    /// returned; they are recorded on the document. Returns
    /// `DocumentNotFound` if the document was deleted before indexing
    /// finished, after removing the chunks indexing wrote.
    pub async fn execute(
        &self,
        user_id: &UserId,
        file: UploadedFile,
        category: DocumentCategory,
    ) -> Result<Document> {
        if file.bytes.is_empty() {
            return Err(RagError::InvalidInput("file is empty".to_string()));
        }

        let document_id = DocumentId::generate();
        let path = format!(
            "{}/{}/{}",
            user_id.to_hex(),
            document_id,
            sanitize_file_name(&file.file_name)
        );
        let blob = self.blobs.put(&path, &file.bytes).await?;

        let now = Utc::now();
        let mut document = Document {
            document_id,
            user_id: *user_id,
            category,
            original_name: file.file_name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.bytes.len() as u64,
            storage_provider: blob.provider,
            storage_path: blob.path,
            public_url: blob.public_url,
            processing_status: ProcessingStatus::Pending,
            processing_error: None,
            chunk_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.put_document(&document)?;

        tracing::info!(
            user_id = %user_id,
            document_id = %document_id,
            category = %category,
            size = document.size_bytes,
            "Document uploaded"
        );

        match self.index(&document, &file).await {
            Ok(Indexed::Chunks(count)) => {
                document.processing_status = ProcessingStatus::Processed;
                document.chunk_count = count;
                tracing::info!(document_id = %document_id, chunks = count, "Document indexed");
            }
            Ok(Indexed::Skipped) => {
                document.processing_status = ProcessingStatus::Skipped;
                tracing::debug!(
                    document_id = %document_id,
                    mime_type = %file.mime_type,
                    "Document not indexed"
                );
            }
            Err(e) => {
                document.processing_status = ProcessingStatus::Failed;
                document.processing_error = Some(e.to_string());
                tracing::warn!(document_id = %document_id, error = %e, "Document indexing failed");
            }
        }

        // The document may have been deleted while indexing ran.
        if self.store.get_document(&document_id)?.is_none() {
            let orphaned = self.store.delete_chunks_by_document(&document_id)?;
            tracing::info!(
                document_id = %document_id,
                chunks = orphaned,
                "Document deleted during upload"
            );
            return Err(RagError::DocumentNotFound(document_id));
        }

        document.updated_at = Utc::now();
        self.store.put_document(&document)?;

        Ok(document)
    }

    /// Extract, chunk, embed and insert the document's text.
    async fn index(&self, document: &Document, file: &UploadedFile) -> Result<Indexed> {
        if !self.extractor.supports(&file.mime_type) {
            return Ok(Indexed::Skipped);
        }

        let extractor = Arc::clone(&self.extractor);
        let mime_type = file.mime_type.clone();
        let bytes = file.bytes.clone();
        let text = tokio::task::spawn_blocking(move || extractor.extract(&mime_type, &bytes))
            .await
            .map_err(|e| RagError::Internal(format!("extraction task failed: {e}")))??;

        if text.trim().is_empty() {
            return Ok(Indexed::Skipped);
        }

        let pieces = self.splitter.split(&text);
        let embeddings = self.embedder.embed_documents(&pieces).await?;
        if embeddings.len() != pieces.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                pieces.len(),
                embeddings.len()
            )));
        }

        let metadata = ChunkMetadata {
            source: document.original_name.clone(),
            page: None,
            mime_type: document.mime_type.clone(),
        };
        let now = Utc::now();
        let chunks = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (content, embedding))| {
                Ok(DocumentChunk {
                    chunk_id: ChunkId::generate(),
                    document_id: document.document_id,
                    user_id: document.user_id,
                    content,
                    embedding: Some(embedding),
                    metadata: metadata.clone(),
                    chunk_index: u32::try_from(index)
                        .map_err(|_| RagError::Internal("too many chunks".to_string()))?,
                    created_at: now,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.vectors.add_documents(&chunks).await?;

        u32::try_from(chunks.len())
            .map(Indexed::Chunks)
            .map_err(|_| RagError::Internal("too many chunks".to_string()))
    }
}

/// Lists a user's documents, newest first.
pub struct ListDocuments {
    store: Arc<dyn Store>,
}

impl ListDocuments {
    /// Create the use case.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// List documents owned by `user_id`, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn execute(
        &self,
        user_id: &UserId,
        category: Option<DocumentCategory>,
    ) -> Result<Vec<Document>> {
        let mut documents = self.store.list_documents_by_user(user_id)?;
        if let Some(category) = category {
            documents.retain(|d| d.category == category);
        }
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }
}

/// Fetches one document.
pub struct GetDocument {
    store: Arc<dyn Store>,
}

impl GetDocument {
    /// Create the use case.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Get a document owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` or `NotOwner`.
    pub fn execute(&self, user_id: &UserId, document_id: &DocumentId) -> Result<Document> {
        load_owned(self.store.as_ref(), user_id, document_id)
    }
}

/// Deletes a document, its blob and its chunks.
pub struct DeleteDocument {
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStorage>,
}

impl DeleteDocument {
    /// Create the use case.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStorage>) -> Self {
        Self { store, blobs }
    }

    /// Delete a document owned by `user_id`.
    ///
    /// Ownership is checked before anything is removed.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` or `NotOwner` without side effects, or an
    /// error if a delete step fails.
    pub async fn execute(&self, user_id: &UserId, document_id: &DocumentId) -> Result<()> {
        let document = load_owned(self.store.as_ref(), user_id, document_id)?;

        self.blobs.delete(&document.storage_path).await?;
        let chunks = self.store.delete_chunks_by_document(document_id)?;
        self.store.delete_document(document_id)?;

        tracing::info!(
            user_id = %user_id,
            document_id = %document_id,
            chunks,
            "Document deleted"
        );
        Ok(())
    }
}
