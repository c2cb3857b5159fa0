//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use hireflow_auth::{IdentityProvider, JwtValidator};

use crate::handlers::{actions, agents, chat, documents, health, profile, threads, users};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /auth/signup` - Register
/// - `POST /auth/signin` - Sign in
///
/// ## Authenticated
/// - `GET /auth/me` - Current user
/// - `GET|POST /api/v1/ingest` - List or upload documents
/// - `GET|DELETE /api/v1/ingest/:document_id` - Get or delete a document
/// - `POST /api/v1/ingest/search` - Similarity search
/// - `GET|POST /api/v1/agents` - List or create agents
/// - `GET|PATCH|DELETE /api/v1/agents/:agent_id` - Get, update or archive
/// - `POST /api/v1/agents/:agent_id/chat` - Chat
/// - `POST /api/v1/agents/:agent_id/chat/stream` - Chat over SSE
/// - `GET|POST /api/v1/agents/:agent_id/threads` - List or open threads
/// - `GET|DELETE /api/v1/agents/:agent_id/threads/:thread_id`
/// - `GET /api/v1/agents/:agent_id/threads/:thread_id/messages`
/// - `POST /api/v1/agents/:agent_id/threads/:thread_id/interrupt`
/// - `POST /api/v1/agents/:agent_id/threads/:thread_id/actions/:action_id/confirm`
/// - `POST /api/v1/agents/:agent_id/threads/:thread_id/actions/:action_id/cancel`
/// - `GET|PATCH /api/v1/profile/me` - Profile
/// - `POST /api/v1/profile/me/roles` - Add a role
/// - `PATCH|DELETE /api/v1/profile/me/roles/:role_id` - Edit or remove a role
pub fn create_router<P, V>(state: GatewayState<P, V>) -> Router
where
    P: IdentityProvider + 'static,
    V: JwtValidator + 'static,
{
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let max_upload_bytes = state.config.max_upload_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    // Uploads get their own, larger body limit
    let uploads = Router::new()
        .route(
            "/api/v1/ingest",
            post(documents::upload_document::<P, V>).get(documents::list_documents::<P, V>),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes));

    let api = Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Auth
        .route("/auth/signup", post(users::sign_up::<P, V>))
        .route("/auth/signin", post(users::sign_in::<P, V>))
        .route("/auth/me", get(users::me::<P, V>))
        // Documents
        .route(
            "/api/v1/ingest/search",
            post(documents::search_documents::<P, V>),
        )
        .route(
            "/api/v1/ingest/:document_id",
            get(documents::get_document::<P, V>).delete(documents::delete_document::<P, V>),
        )
        // Agents
        .route(
            "/api/v1/agents",
            get(agents::list_agents::<P, V>).post(agents::create_agent::<P, V>),
        )
        .route(
            "/api/v1/agents/:agent_id",
            get(agents::get_agent::<P, V>)
                .patch(agents::update_agent::<P, V>)
                .delete(agents::archive_agent::<P, V>),
        )
        // Chat
        .route("/api/v1/agents/:agent_id/chat", post(chat::chat::<P, V>))
        .route(
            "/api/v1/agents/:agent_id/chat/stream",
            post(chat::chat_stream::<P, V>),
        )
        // Threads
        .route(
            "/api/v1/agents/:agent_id/threads",
            get(threads::list_threads::<P, V>).post(threads::create_thread::<P, V>),
        )
        .route(
            "/api/v1/agents/:agent_id/threads/:thread_id",
            get(threads::get_thread::<P, V>).delete(threads::delete_thread::<P, V>),
        )
        .route(
            "/api/v1/agents/:agent_id/threads/:thread_id/messages",
            get(threads::list_messages::<P, V>),
        )
        .route(
            "/api/v1/agents/:agent_id/threads/:thread_id/interrupt",
            post(threads::interrupt_thread::<P, V>),
        )
        // Actions
        .route(
            "/api/v1/agents/:agent_id/threads/:thread_id/actions/:action_id/confirm",
            post(actions::confirm_action::<P, V>),
        )
        .route(
            "/api/v1/agents/:agent_id/threads/:thread_id/actions/:action_id/cancel",
            post(actions::cancel_action::<P, V>),
        )
        // Profile
        .route(
            "/api/v1/profile/me",
            get(profile::get_profile::<P, V>).patch(profile::update_profile::<P, V>),
        )
        .route("/api/v1/profile/me/roles", post(profile::add_role::<P, V>))
        .route(
            "/api/v1/profile/me/roles/:role_id",
            patch(profile::update_role::<P, V>).delete(profile::delete_role::<P, V>),
        )
        .layer(RequestBodyLimitLayer::new(max_body_bytes));

    Router::new()
        .merge(uploads)
        .merge(api)
        // Middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_layers_build() {
        let _any = build_cors_layer(&["*".to_string()]);
        let _listed = build_cors_layer(&[
            "http://localhost:3000".to_string(),
            "not a header value\n".to_string(),
        ]);
    }
}
