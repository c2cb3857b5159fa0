//! Authentication error types.
//!
//! Token problems and rejected credentials are the caller's fault (401/400);
//! key-set and upstream failures are ours (500).

use thiserror::Error;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised while validating tokens or talking to Supabase Auth.
#[derive(Debug, Error)]
pub enum AuthError {
    // --- token validation ---
    /// `exp` is in the past.
    #[error("token expired")]
    TokenExpired,

    /// The signature does not verify against the expected key.
    #[error("invalid signature")]
    InvalidSignature,

    /// `iss` is not this project's auth endpoint.
    #[error("invalid issuer")]
    InvalidIssuer,

    /// `aud` is not `authenticated`.
    #[error("invalid audience")]
    InvalidAudience,

    /// `sub` is not a UUID.
    #[error("subject is not a valid identity ID")]
    InvalidIdentityId,

    /// A claim the gateway relies on is absent.
    #[error("missing required claim: {0}")]
    MissingClaim(String),

    /// The token could not be parsed at all.
    #[error("malformed token: {0}")]
    InvalidToken(String),

    /// The header names an algorithm outside HS256/RS256/ES256.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    // --- signing keys ---
    /// No published key matches the token's `kid`.
    #[error("signing key {0} not published")]
    KeyNotFound(String),

    /// The JWKS endpoint could not be read.
    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    // --- sign-up / sign-in ---
    /// Wrong email or password.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// Supabase refused the registration, e.g. the email is taken.
    #[error("sign-up failed: {0}")]
    SignUpFailed(String),

    /// Supabase throttled the request.
    #[error("rate limited")]
    RateLimited,

    /// Supabase answered with an unexpected status.
    #[error("identity provider returned HTTP {0}")]
    Upstream(u16),

    /// The request never reached Supabase or its answer was unreadable.
    #[error("identity provider unreachable: {0}")]
    Transport(String),

    /// A failure inside this crate.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::TokenExpired
            | Self::InvalidSignature
            | Self::InvalidIssuer
            | Self::InvalidAudience
            | Self::InvalidIdentityId
            | Self::MissingClaim(_)
            | Self::InvalidToken(_)
            | Self::UnsupportedAlgorithm(_)
            | Self::LoginFailed(_) => 401,
            Self::SignUpFailed(_) => 400,
            Self::RateLimited => 429,
            Self::KeyNotFound(_)
            | Self::JwksFetchFailed(_)
            | Self::Upstream(_)
            | Self::Transport(_)
            | Self::Internal(_) => 500,
        }
    }
}
