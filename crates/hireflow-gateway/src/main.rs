//! Hireflow Gateway - HTTP API for the recruitment assistant.
//!
//! This is the composition root: it reads configuration, opens the store
//! and wires every service before serving the router.
//!
//! # Dev Mode
//!
//! Build with `--features dev-mode` to replace Supabase with in-memory
//! sign-up/sign-in and a mock JWT validator. Tokens take the form
//! `test-token:<identity-uuid>[:<email>]`.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hireflow_agent::{build_chat_model, ChatConfig, ChatModelConfig};
#[cfg(feature = "dev-mode")]
use hireflow_auth::{MockIdentityProvider, MockJwtValidator};
#[cfg(not(feature = "dev-mode"))]
use hireflow_auth::{SupabaseAuthClient, SupabaseJwtValidator};
use hireflow_gateway::{create_router, AppConfig, GatewayState, ServiceSettings, Services};
use hireflow_rag::{DefaultTextExtractor, EmbeddingConfig, LocalBlobStorage};
use hireflow_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hireflow=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Hireflow Gateway");

    let config = AppConfig::from_env()?;

    tracing::info!(
        listen_addr = %config.gateway.listen_addr,
        data_dir = %config.data_dir,
        blob_dir = %config.blob_dir,
        llm_provider = %config.llm_provider,
        chat_model = %config.chat_model,
        embedding_model = %config.embedding_model,
        "Gateway configuration loaded"
    );

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    let blobs = Arc::new(LocalBlobStorage::new(
        &config.blob_dir,
        &config.public_base_url,
    ));
    let embedder = config.llm_provider.embedder(EmbeddingConfig::new(
        config.llm_base_url(),
        &config.llm_api_key,
        &config.embedding_model,
    ));
    let model = build_chat_model(
        ChatModelConfig::new(config.llm_provider, &config.llm_api_key, &config.chat_model)
            .with_base_url(config.llm_base_url()),
    );

    let settings = ServiceSettings {
        chat: ChatConfig {
            max_tool_rounds: config.max_tool_rounds,
        },
        action_ttl: config.action_ttl(),
        action_max_entries: config.action_max_entries,
        ..ServiceSettings::default()
    };
    let services = Services::build(
        store,
        blobs,
        Arc::new(DefaultTextExtractor),
        embedder,
        model,
        settings,
    );
    tracing::info!("Services initialized");

    // Initialize authentication
    #[cfg(feature = "dev-mode")]
    let (identity, jwt_validator) = {
        tracing::warn!("DEV MODE ENABLED - using in-memory identity provider");
        tracing::warn!("Use tokens in format: test-token:<identity-uuid>[:<email>]");
        (
            Arc::new(MockIdentityProvider::default()),
            Arc::new(MockJwtValidator),
        )
    };

    #[cfg(not(feature = "dev-mode"))]
    let (identity, jwt_validator) = {
        let auth_config = config.auth_config()?;
        (
            Arc::new(SupabaseAuthClient::new(auth_config.clone())),
            Arc::new(SupabaseJwtValidator::new(auth_config)),
        )
    };
    tracing::info!("Authentication initialized");

    let listen_addr = config.gateway.listen_addr.clone();
    let state = GatewayState::new(services, identity, jwt_validator, config.gateway);
    let app = create_router(state);

    // Start HTTP server
    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
