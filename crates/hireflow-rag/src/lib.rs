//! Document ingestion and retrieval for hireflow.
//!
//! Uploaded files are stored as blobs, their text is extracted, split into
//! overlapping windows, embedded and indexed per user. Retrieval embeds a
//! query and returns the user's closest chunks.
//!
//! # Pipeline
//!
//! ```text
//! upload ──▶ BlobStorage ──▶ Document (pending)
//!                                │
//!                    TextExtractor (PDF / text / markdown)
//!                                │
//!                         TextSplitter (1000 / 200)
//!                                │
//!                     Embedder::embed_documents
//!                                │
//!                     VectorStore::add_documents ──▶ Document (processed)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod blob;
pub mod chunker;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod retrieve;
pub mod vector;

pub use blob::{BlobStorage, LocalBlobStorage, StoredBlob};
pub use chunker::TextSplitter;
pub use embedding::{Embedder, EmbeddingConfig, GeminiEmbedder, OpenAiEmbedder};
pub use error::{RagError, Result};
pub use extract::{DefaultTextExtractor, TextExtractor};
pub use ingest::{DeleteDocument, GetDocument, ListDocuments, UploadDocument, UploadedFile};
pub use retrieve::{RetrieveContext, DEFAULT_K};
pub use vector::{ScoredChunk, StoreVectorIndex, VectorStore};

#[cfg(any(test, feature = "test-utils"))]
pub use blob::MemoryBlobStorage;
#[cfg(any(test, feature = "test-utils"))]
pub use embedding::HashEmbedder;
