//! JWT validation and claims extraction.
//!
//! Supabase signs access tokens either with the project's shared HS256
//! secret or with an asymmetric key published over JWKS. The header's `alg`
//! decides which path a token takes.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use hireflow_core::IdentityId;

use crate::error::{AuthError, Result};
use crate::jwks::JwksProvider;
use crate::AuthConfig;

/// Validated claims extracted from a JWT.
#[derive(Debug, Clone)]
pub struct ValidatedClaims {
    /// The identity ID extracted from the `sub` claim.
    pub identity_id: IdentityId,
    /// The email address, when the token carries one.
    pub email: Option<String>,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
}

/// Trait for validating JWTs.
#[async_trait]
pub trait JwtValidator: Send + Sync {
    /// Validate a JWT and extract claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid, expired, or cannot be validated.
    async fn validate(&self, token: &str) -> Result<ValidatedClaims>;
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    /// Subject (identity UUID)
    sub: String,
    #[serde(default)]
    email: Option<String>,
    /// Audience (can be string or array)
    #[serde(default)]
    aud: Audience,
    exp: u64,
}

/// Audience claim that can be either a string or array.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(untagged)]
enum Audience {
    Single(String),
    Multiple(Vec<String>),
    #[default]
    None,
}

impl Audience {
    fn contains(&self, value: &str) -> bool {
        match self {
            Self::Single(s) => s == value,
            Self::Multiple(v) => v.iter().any(|s| s == value),
            Self::None => false,
        }
    }
}

/// JWT validator for Supabase-issued access tokens.
pub struct SupabaseJwtValidator {
    config: AuthConfig,
    jwks: JwksProvider,
}

impl SupabaseJwtValidator {
    /// Create a new validator.
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let jwks = JwksProvider::new(config.clone());
        Self { config, jwks }
    }

    /// Resolve the key and algorithm a token must be verified with.
    async fn resolve_key(&self, token: &str) -> Result<(DecodingKey, Algorithm)> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        match header.alg {
            Algorithm::HS256 => {
                let secret = self.config.jwt_secret.as_deref().ok_or_else(|| {
                    AuthError::UnsupportedAlgorithm("HS256 without a configured secret".into())
                })?;
                Ok((DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256))
            }
            Algorithm::ES256 | Algorithm::RS256 | Algorithm::EdDSA => {
                let kid = header
                    .kid
                    .ok_or_else(|| AuthError::MissingClaim("kid".to_string()))?;
                let verifying = self.jwks.get_key(&kid).await?;
                if verifying.algorithm != header.alg {
                    return Err(AuthError::UnsupportedAlgorithm(format!(
                        "{:?} for key {kid}",
                        header.alg
                    )));
                }
                Ok((verifying.key, verifying.algorithm))
            }
            other => Err(AuthError::UnsupportedAlgorithm(format!("{other:?}"))),
        }
    }
}

#[async_trait]
impl JwtValidator for SupabaseJwtValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        let (key, algorithm) = self.resolve_key(token).await?;

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[self.config.issuer()]);
        // Audience is checked below since it can be string or array
        validation.validate_aud = false;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<RawClaims>(token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
            _ => AuthError::InvalidToken(e.to_string()),
        })?;

        let claims = token_data.claims;

        if !claims.aud.contains(&self.config.audience) {
            return Err(AuthError::InvalidAudience);
        }

        let identity_id =
            IdentityId::from_str(&claims.sub).map_err(|_| AuthError::InvalidIdentityId)?;

        let exp_secs = i64::try_from(claims.exp).unwrap_or(i64::MAX);
        let expires_at = DateTime::from_timestamp(exp_secs, 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid exp timestamp".to_string()))?;

        Ok(ValidatedClaims {
            identity_id,
            email: claims.email,
            expires_at,
        })
    }
}

/// A mock JWT validator for testing.
///
/// Accepts tokens of the form `test-token:<identity_uuid>[:<email>]`.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockJwtValidator;

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl JwtValidator for MockJwtValidator {
    async fn validate(&self, token: &str) -> Result<ValidatedClaims> {
        let rest = token.strip_prefix("test-token:").ok_or_else(|| {
            AuthError::InvalidToken("expected test-token:<identity>[:<email>]".to_string())
        })?;

        let (identity, email) = match rest.split_once(':') {
            Some((identity, email)) => (identity, Some(email.to_string())),
            None => (rest, None),
        };

        let identity_id =
            IdentityId::from_str(identity).map_err(|_| AuthError::InvalidIdentityId)?;

        Ok(ValidatedClaims {
            identity_id,
            email,
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
    }
}
