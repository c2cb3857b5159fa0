//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! Supabase projects using asymmetric signing keys publish them at
//! `/auth/v1/.well-known/jwks.json`. Keys are cached and refreshed on a fixed
//! interval or when an unknown `kid` shows up.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, DecodingKey};
use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// JWKS response from the authentication server.
#[derive(Debug, Deserialize)]
pub struct JwksResponse {
    /// The list of keys.
    pub keys: Vec<JwkKey>,
}

/// A single JWK (JSON Web Key).
#[derive(Debug, Default, Deserialize)]
pub struct JwkKey {
    /// Key type ("EC", "RSA" or "OKP").
    pub kty: String,
    /// Curve for EC and OKP keys.
    pub crv: Option<String>,
    /// EC/OKP x coordinate (base64url).
    pub x: Option<String>,
    /// EC y coordinate (base64url).
    pub y: Option<String>,
    /// RSA modulus (base64url).
    pub n: Option<String>,
    /// RSA exponent (base64url).
    pub e: Option<String>,
    /// Key ID.
    pub kid: Option<String>,
    /// Algorithm (e.g. `ES256`).
    pub alg: Option<String>,
}

/// A decoding key together with the algorithm it verifies.
#[derive(Clone)]
pub struct VerifyingKey {
    /// The decoding key.
    pub key: DecodingKey,
    /// The algorithm tokens signed with this key must use.
    pub algorithm: Algorithm,
}

/// Cached JWKS keys with expiration.
struct CachedKeys {
    keys: HashMap<String, VerifyingKey>,
    fetched_at: Instant,
}

impl Default for CachedKeys {
    fn default() -> Self {
        Self {
            keys: HashMap::new(),
            // Set to far past so first access triggers fetch
            fetched_at: Instant::now()
                .checked_sub(Duration::from_secs(3600))
                .unwrap_or_else(Instant::now),
        }
    }
}

/// JWKS key provider that fetches and caches keys.
pub struct JwksProvider {
    config: AuthConfig,
    client: reqwest::Client,
    cache: RwLock<CachedKeys>,
}

impl JwksProvider {
    /// Create a new JWKS provider with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with default TLS).
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to create HTTP client");

        Self {
            config,
            client,
            cache: RwLock::new(CachedKeys::default()),
        }
    }

    /// Get a verifying key by key ID, fetching from JWKS if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not found or JWKS fetch fails.
    pub async fn get_key(&self, kid: &str) -> Result<VerifyingKey> {
        {
            let cache = self.cache.read();
            let refresh_interval = Duration::from_secs(self.config.jwks_refresh_seconds);
            if cache.fetched_at.elapsed() < refresh_interval {
                if let Some(key) = cache.keys.get(kid) {
                    return Ok(key.clone());
                }
            }
        }

        self.refresh_keys().await?;

        let cache = self.cache.read();
        cache
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
    }

    /// Refresh the JWKS cache by fetching from the server.
    async fn refresh_keys(&self) -> Result<()> {
        let jwks_url = self.config.jwks_url();
        tracing::debug!(url = %jwks_url, "Fetching JWKS");

        let response: JwksResponse = self
            .client
            .get(&jwks_url)
            .header("apikey", &self.config.anon_key)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchFailed(e.to_string()))?;

        let mut new_keys = HashMap::new();

        for key in response.keys {
            if let Some(kid) = &key.kid {
                if let Some(verifying_key) = Self::parse_key(&key)? {
                    new_keys.insert(kid.clone(), verifying_key);
                }
            }
        }

        tracing::debug!(count = new_keys.len(), "Cached JWKS keys");

        let mut cache = self.cache.write();
        cache.keys = new_keys;
        cache.fetched_at = Instant::now();

        Ok(())
    }

    /// Parse a JWK into a `VerifyingKey`.
    ///
    /// Unsupported key types are skipped rather than rejected.
    fn parse_key(key: &JwkKey) -> Result<Option<VerifyingKey>> {
        let missing = |param: &str| AuthError::InvalidToken(format!("missing {param} parameter"));
        let invalid = |e: jsonwebtoken::errors::Error| AuthError::InvalidToken(e.to_string());

        match key.kty.as_str() {
            "EC" => {
                let crv = key.crv.as_deref().unwrap_or("");
                if crv != "P-256" {
                    tracing::warn!(crv = crv, "Unsupported EC curve");
                    return Ok(None);
                }
                let x = key.x.as_deref().ok_or_else(|| missing("x"))?;
                let y = key.y.as_deref().ok_or_else(|| missing("y"))?;
                Ok(Some(VerifyingKey {
                    key: DecodingKey::from_ec_components(x, y).map_err(invalid)?,
                    algorithm: Algorithm::ES256,
                }))
            }
            "RSA" => {
                let n = key.n.as_deref().ok_or_else(|| missing("n"))?;
                let e = key.e.as_deref().ok_or_else(|| missing("e"))?;
                Ok(Some(VerifyingKey {
                    key: DecodingKey::from_rsa_components(n, e).map_err(invalid)?,
                    algorithm: Algorithm::RS256,
                }))
            }
            "OKP" => {
                let crv = key.crv.as_deref().unwrap_or("");
                if crv != "Ed25519" {
                    tracing::warn!(crv = crv, "Unsupported OKP curve");
                    return Ok(None);
                }
                let x = key.x.as_deref().ok_or_else(|| missing("x"))?;
                Ok(Some(VerifyingKey {
                    key: DecodingKey::from_ed_components(x).map_err(invalid)?,
                    algorithm: Algorithm::EdDSA,
                }))
            }
            other => {
                tracing::warn!(kty = other, "Unknown key type");
                Ok(None)
            }
        }
    }
}
