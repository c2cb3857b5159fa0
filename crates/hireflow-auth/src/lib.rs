//! Supabase authentication for hireflow.
//!
//! This crate wraps the Supabase Auth (`GoTrue`) API:
//!
//! - Email/password sign-up and sign-in through [`IdentityProvider`]
//! - JWT validation through [`JwtValidator`], using either the project's
//!   shared HS256 secret or the published JWKS (ES256/RS256)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────┐
//! │   Gateway        │────▶│   JwtValidator       │
//! │   (HTTP)         │     │   (trait)            │
//! └────────┬─────────┘     └──────────┬───────────┘
//!          │                          │
//!          │               ┌──────────▼───────────┐
//!          │               │ SupabaseJwtValidator │──▶ HS256 secret
//!          │               └──────────┬───────────┘
//!          │                          │ kid
//!          │               ┌──────────▼───────────┐
//!          │               │  JwksProvider        │
//!          │               └──────────┬───────────┘
//!          │                          │ HTTPS
//! ┌────────▼─────────┐     ┌──────────▼───────────┐
//! │ IdentityProvider │────▶│   Supabase Auth      │
//! │ (sign up / in)   │     │   /auth/v1           │
//! └──────────────────┘     └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use hireflow_auth::{AuthConfig, JwtValidator, SupabaseJwtValidator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthConfig::new("https://project.supabase.co", "anon-key")
//!     .with_jwt_secret("super-secret");
//!
//! let validator = SupabaseJwtValidator::new(config);
//! let claims = validator.validate("eyJhbGciOiJIUzI1NiJ9...").await?;
//!
//! println!("Identity ID: {}", claims.identity_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod jwks;
pub mod jwt;

pub use client::{AuthSession, Credentials, IdentityProvider, IdentityUser, SupabaseAuthClient};
pub use error::{AuthError, Result};
pub use jwt::{JwtValidator, SupabaseJwtValidator, ValidatedClaims};

#[cfg(any(test, feature = "test-utils"))]
pub use client::MockIdentityProvider;
#[cfg(any(test, feature = "test-utils"))]
pub use jwt::MockJwtValidator;

/// Configuration for authentication with Supabase.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Project URL (e.g., `https://project.supabase.co`).
    pub base_url: String,
    /// Public anon key, sent as the `apikey` header.
    pub anon_key: String,
    /// Shared HS256 secret; when absent only JWKS-signed tokens validate.
    pub jwt_secret: Option<String>,
    /// Expected JWT audience (`aud` claim).
    pub audience: String,
    /// How often to refresh the JWKS cache, in seconds.
    pub jwks_refresh_seconds: u64,
}

impl AuthConfig {
    /// Create a configuration with default audience and refresh interval.
    #[must_use]
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            jwt_secret: None,
            audience: "authenticated".to_string(),
            jwks_refresh_seconds: 300,
        }
    }

    /// Set the shared HS256 secret.
    #[must_use]
    pub fn with_jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    /// Get the JWKS endpoint URL.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        format!("{}/auth/v1/.well-known/jwks.json", self.base_url)
    }

    /// Get the sign-up endpoint URL.
    #[must_use]
    pub fn signup_url(&self) -> String {
        format!("{}/auth/v1/signup", self.base_url)
    }

    /// Get the password-grant token endpoint URL.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/auth/v1/token?grant_type=password", self.base_url)
    }

    /// Get the expected JWT issuer.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!("{}/auth/v1", self.base_url)
    }
}
