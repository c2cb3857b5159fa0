//! Document ingestion endpoints.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use validator::Validate;

use hireflow_auth::{IdentityProvider, JwtValidator};
use hireflow_core::{parse_id, ChunkId, DocumentId};
use hireflow_rag::{ScoredChunk, UploadedFile, DEFAULT_K};
use hireflow_store::DocumentCategory;

use super::{created, ok, Deleted};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query parameters for listing documents.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Only documents of this category.
    #[serde(default)]
    pub category: Option<String>,
}

/// Request to search the user's documents.
#[derive(Debug, Deserialize, Validate)]
pub struct SearchBody {
    /// Free-text query. An empty query matches nothing.
    pub query: String,
    /// Number of chunks to return.
    #[serde(default)]
    #[validate(range(min = 1, max = 20))]
    pub k: Option<usize>,
}

/// A chunk returned by search.
#[derive(Debug, Serialize)]
pub struct SearchHit {
    /// Chunk ID.
    pub chunk_id: ChunkId,
    /// Parent document.
    pub document_id: DocumentId,
    /// Original filename of the parent document.
    pub source: String,
    /// Position inside the parent document.
    pub chunk_index: u32,
    /// Chunk text.
    pub content: String,
    /// Cosine similarity to the query.
    pub score: f32,
}

impl From<ScoredChunk> for SearchHit {
    fn from(hit: ScoredChunk) -> Self {
        Self {
            chunk_id: hit.chunk.chunk_id,
            document_id: hit.chunk.document_id,
            source: hit.chunk.metadata.source,
            chunk_index: hit.chunk.chunk_index,
            content: hit.chunk.content,
            score: hit.score,
        }
    }
}

fn parse_category(raw: &str) -> Result<DocumentCategory, ApiError> {
    raw.trim().parse().map_err(ApiError::BadRequest)
}

// =============================================================================
// Handlers
// =============================================================================

/// Upload a document as multipart form data.
///
/// Fields: `file` (required) and `category` (defaults to `other`).
///
/// # Errors
///
/// Returns 400 for a missing or empty file or an unknown category, and 413
/// when the file exceeds the upload limit.
pub async fn upload_document<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let mut file = None;
    let mut category = DocumentCategory::Other;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("category") => {
                let raw = field.text().await.map_err(multipart_error)?;
                category = parse_category(&raw)?;
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("missing file field".to_string()))?;
    if file.bytes.len() > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "file exceeds {} bytes",
            state.config.max_upload_bytes
        )));
    }

    let document = state
        .services
        .upload
        .execute(&user.user_id, file, category)
        .await?;

    Ok(created(document))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("upload too large".to_string())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// List the user's documents, newest first.
///
/// # Errors
///
/// Returns 400 for an unknown category.
pub async fn list_documents<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let category = query.category.as_deref().map(parse_category).transpose()?;
    let documents = state
        .services
        .list_documents
        .execute(&user.user_id, category)?;

    Ok(ok(documents))
}

/// Get one document.
///
/// # Errors
///
/// Returns 404 if the document doesn't exist and 403 if it belongs to
/// someone else.
pub async fn get_document<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let document_id: DocumentId = parse_id("document_id", &document_id)?;
    let document = state
        .services
        .get_document
        .execute(&user.user_id, &document_id)?;

    Ok(ok(document))
}

/// Delete a document with its chunks and stored file.
///
/// # Errors
///
/// Returns 404 if the document doesn't exist and 403 if it belongs to
/// someone else.
pub async fn delete_document<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    Path(document_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let document_id: DocumentId = parse_id("document_id", &document_id)?;
    state
        .services
        .delete_document
        .execute(&user.user_id, &document_id)
        .await?;

    Ok(ok(Deleted::new(document_id)))
}

/// Search the user's documents.
///
/// # Errors
///
/// Returns 400 if `k` is out of range.
pub async fn search_documents<P, V>(
    State(state): State<Arc<GatewayState<P, V>>>,
    user: AuthUser,
    ValidJson(body): ValidJson<SearchBody>,
) -> Result<impl IntoResponse, ApiError>
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    let hits = state
        .services
        .retrieve
        .execute(&user.user_id, &body.query, body.k.unwrap_or(DEFAULT_K))
        .await?;

    Ok(ok(hits.into_iter().map(SearchHit::from).collect::<Vec<_>>()))
}
