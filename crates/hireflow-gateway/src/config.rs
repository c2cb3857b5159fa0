//! Gateway configuration types.
//!
//! [`GatewayConfig`] covers the HTTP surface; [`AppConfig`] adds everything
//! the composition root needs and is read from the environment.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use hireflow_agent::ProviderKind;
use hireflow_auth::AuthConfig;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but does not parse.
    #[error("invalid value for {name}: {message}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum JSON request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds. Streams are bounded only until their
    /// headers are sent.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Maximum upload size in bytes.
    #[serde(default = "GatewayConfig::default_max_upload")]
    pub max_upload_bytes: usize,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    const fn default_request_timeout() -> u64 {
        120
    }

    const fn default_max_upload() -> usize {
        10 * 1024 * 1024 // 10 MB
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
            max_upload_bytes: Self::default_max_upload(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP settings.
    pub gateway: GatewayConfig,
    /// RocksDB directory.
    pub data_dir: String,
    /// Root directory for uploaded files.
    pub blob_dir: String,
    /// URL prefix under which uploaded files are published.
    pub public_base_url: String,
    /// Supabase project URL.
    pub supabase_url: Option<String>,
    /// Supabase anonymous API key.
    pub supabase_anon_key: Option<String>,
    /// Supabase JWT secret for HS256 tokens.
    pub supabase_jwt_secret: Option<String>,
    /// Model vendor for chat and embeddings.
    pub llm_provider: ProviderKind,
    /// Vendor API key.
    pub llm_api_key: String,
    /// Override for the vendor API base URL.
    pub llm_base_url: Option<String>,
    /// Chat model name.
    pub chat_model: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Tool rounds per chat turn.
    pub max_tool_rounds: usize,
    /// How long a proposed action waits for a decision.
    pub action_ttl_seconds: u64,
    /// Most pending actions held at once.
    pub action_max_entries: usize,
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `LLM_API_KEY` is missing or a variable
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    /// if it is set.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let llm_provider = match var("LLM_PROVIDER") {
            Some(raw) => raw.parse::<ProviderKind>().map_err(|e| {
                ConfigError::Invalid {
                    name: "LLM_PROVIDER",
                    message: e.to_string(),
                }
            })?,
            None => ProviderKind::OpenAi,
        };

        let gateway = GatewayConfig {
            listen_addr: var("LISTEN_ADDR").unwrap_or_else(GatewayConfig::default_listen_addr),
            cors_origins: var("CORS_ORIGINS").map_or_else(
                || vec!["*".to_string()],
                |raw| raw.split(',').map(|o| o.trim().to_string()).collect(),
            ),
            ..GatewayConfig::default()
        };

        Ok(Self {
            gateway,
            data_dir: var("DATA_DIR").unwrap_or_else(|| "./data/hireflow".to_string()),
            blob_dir: var("BLOB_DIR").unwrap_or_else(|| "./data/uploads".to_string()),
            public_base_url: var("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080/files".to_string()),
            supabase_url: var("SUPABASE_URL"),
            supabase_anon_key: var("SUPABASE_ANON_KEY"),
            supabase_jwt_secret: var("SUPABASE_JWT_SECRET"),
            llm_provider,
            llm_api_key: var("LLM_API_KEY").ok_or(ConfigError::Missing("LLM_API_KEY"))?,
            llm_base_url: var("LLM_BASE_URL"),
            chat_model: var("CHAT_MODEL")
                .unwrap_or_else(|| default_chat_model(llm_provider).to_string()),
            embedding_model: var("EMBEDDING_MODEL")
                .unwrap_or_else(|| default_embedding_model(llm_provider).to_string()),
            max_tool_rounds: parse_or(&var, "MAX_TOOL_ROUNDS", 5)?,
            action_ttl_seconds: parse_or(&var, "ACTION_TTL_SECONDS", 3600)?,
            action_max_entries: parse_or(&var, "ACTION_MAX_ENTRIES", 10_000)?,
        })
    }

    /// Build the Supabase settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the project URL or anonymous key
    /// is not set.
    pub fn auth_config(&self) -> Result<AuthConfig, ConfigError> {
        let url = self
            .supabase_url
            .as_deref()
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let anon_key = self
            .supabase_anon_key
            .as_deref()
            .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        let config = AuthConfig::new(url, anon_key);
        Ok(match &self.supabase_jwt_secret {
            Some(secret) => config.with_jwt_secret(secret),
            None => config,
        })
    }

    /// API base URL for the model vendor.
    #[must_use]
    pub fn llm_base_url(&self) -> &str {
        self.llm_base_url
            .as_deref()
            .unwrap_or_else(|| self.llm_provider.default_base_url())
    }

    /// How long a proposed action waits for a decision.
    #[must_use]
    pub fn action_ttl(&self) -> Duration {
        Duration::from_secs(self.action_ttl_seconds)
    }
}

const fn default_chat_model(provider: ProviderKind) -> &'static str {
    match provider {
        ProviderKind::OpenAi => "gpt-4o-mini",
        ProviderKind::Gemini => "gemini-1.5-flash",
    }
}

const fn default_embedding_model(provider: ProviderKind) -> &'static str {
    match provider {
        ProviderKind::OpenAi => "text-embedding-3-small",
        ProviderKind::Gemini => "text-embedding-004",
    }
}

fn parse_or<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(name).map_or(Ok(default), |raw| {
        raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            message: e.to_string(),
        })
    })
}
