//! HTTP request handlers.
//!
//! Successful responses are wrapped as `{"success": true, "data": ...}`.

pub mod actions;
pub mod agents;
pub mod chat;
pub mod documents;
pub mod health;
pub mod profile;
pub mod threads;
pub mod users;

use std::convert::Infallible;

use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// The payload.
    pub data: T,
}

/// Wrap `data` in a 200 response.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

/// Wrap `data` in a 201 response.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}

/// Payload for deletions.
#[derive(Debug, Serialize)]
pub struct Deleted {
    /// ID of the removed record.
    pub id: String,
    /// Always `true`.
    pub deleted: bool,
}

impl Deleted {
    fn new(id: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            deleted: true,
        }
    }
}

/// Serialize `value` as the data of an SSE event.
///
/// Events that fail to serialize are logged and dropped.
fn sse_event<T: Serialize>(value: &T) -> Option<Event> {
    Event::default()
        .json_data(value)
        .map_err(|e| tracing::warn!(error = %e, "Dropping unserializable event"))
        .ok()
}

/// Stream the events received on `rx` until every sender is dropped.
fn sse_stream(rx: mpsc::Receiver<Event>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
