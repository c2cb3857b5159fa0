//! HTTP gateway for the hireflow recruitment assistant.
//!
//! This crate is the public-facing API. It handles:
//!
//! - Sign-up and sign-in through Supabase, and bearer-token authentication
//! - Document upload, listing, deletion and search
//! - Agents, threads and chat, blocking or streamed as server-sent events
//! - Action confirmation and turn interruption
//! - Candidate profiles and their completeness
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Clients                              │
//! │                    (HTTP / SSE)                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    hireflow-gateway                         │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Auth      │ │   Router    │ │    Services         │    │
//! │  │  Extractor  │ │  + Handlers │ │   (use cases)       │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌──────────────┬──────┴───────┬──────────────┐
//!        ▼              ▼              ▼              ▼
//!   ┌─────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//!   │  Auth   │   │   RAG    │   │  Agent   │   │ Profile  │
//!   │(Supabase│   │ (ingest, │   │ (chat,   │   │          │
//!   │   JWT)  │   │ retrieve)│   │ actions) │   │          │
//!   └─────────┘   └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hireflow_agent::{build_chat_model, ChatModelConfig, ProviderKind};
//! use hireflow_auth::{AuthConfig, SupabaseAuthClient, SupabaseJwtValidator};
//! use hireflow_gateway::{create_router, GatewayConfig, GatewayState, ServiceSettings, Services};
//! use hireflow_rag::{DefaultTextExtractor, EmbeddingConfig, LocalBlobStorage};
//! use hireflow_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/hireflow")?);
//! let provider = ProviderKind::OpenAi;
//! let embedder = provider.embedder(EmbeddingConfig::new(
//!     provider.default_base_url(),
//!     "sk-...",
//!     "text-embedding-3-small",
//! ));
//! let model = build_chat_model(ChatModelConfig::new(provider, "sk-...", "gpt-4o-mini"));
//!
//! let services = Services::build(
//!     store,
//!     Arc::new(LocalBlobStorage::new("/tmp/uploads", "http://localhost:8080/files")),
//!     Arc::new(DefaultTextExtractor),
//!     embedder,
//!     model,
//!     ServiceSettings::default(),
//! );
//!
//! let auth = AuthConfig::new("https://project.supabase.co", "anon-key");
//! let state = GatewayState::new(
//!     services,
//!     Arc::new(SupabaseAuthClient::new(auth.clone())),
//!     Arc::new(SupabaseJwtValidator::new(auth)),
//!     GatewayConfig::default(),
//! );
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, create_router(state)).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{AppConfig, ConfigError, GatewayConfig};
pub use error::{ApiError, FieldError};
pub use routes::create_router;
pub use state::{GatewayState, ServiceSettings, Services};

// Re-export key types for convenience
pub use auth::AuthUser;
