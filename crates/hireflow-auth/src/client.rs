//! Supabase Auth client for email/password sign-up and sign-in.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hireflow_core::IdentityId;

use crate::error::{AuthError, Result};
use crate::AuthConfig;

/// Email/password credentials.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    /// User's email address.
    pub email: String,
    /// User's password.
    pub password: String,
}

/// The identity-provider user behind a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    /// Identity-provider user ID.
    pub identity_id: IdentityId,
    /// Registered email address.
    pub email: Option<String>,
}

/// Result of a sign-up or sign-in.
///
/// Sign-up returns no tokens when the project requires email confirmation.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The authenticated user.
    pub user: IdentityUser,
    /// JWT access token.
    pub access_token: Option<String>,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,
    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Trait for delegating sign-up and sign-in to an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `SignUpFailed` if the provider rejects the registration.
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthSession>;

    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// Returns `LoginFailed` if the credentials are invalid.
    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession>;
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Session response from the token endpoint (and sign-up without confirmation).
#[derive(Debug, Deserialize)]
struct RawSession {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
    user: RawUser,
}

/// Sign-up answers with either a session or a bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSignUp {
    Session(RawSession),
    User(RawUser),
}

/// Error response from Supabase Auth. Older endpoints use `error_description`,
/// newer ones `msg`.
#[derive(Debug, Default, Deserialize)]
struct RawError {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RawError {
    fn into_message(self) -> Option<String> {
        self.msg.or(self.error_description).or(self.message)
    }
}

/// Which endpoint produced an error response.
#[derive(Debug, Clone, Copy)]
enum Flow {
    SignUp,
    SignIn,
}

impl RawUser {
    fn into_user(self) -> Result<IdentityUser> {
        let identity_id = IdentityId::from_str(&self.id)
            .map_err(|_| AuthError::Internal("invalid user id in response".to_string()))?;
        Ok(IdentityUser {
            identity_id,
            email: self.email,
        })
    }
}

impl RawSession {
    fn into_session(self) -> Result<AuthSession> {
        let expires_in_secs = i64::try_from(self.expires_in).unwrap_or(i64::MAX);
        let expires_at = Utc::now() + chrono::Duration::seconds(expires_in_secs);

        Ok(AuthSession {
            user: self.user.into_user()?,
            access_token: Some(self.access_token),
            refresh_token: Some(self.refresh_token),
            expires_at: Some(expires_at),
        })
    }
}

/// Client for the Supabase Auth REST API.
pub struct SupabaseAuthClient {
    config: AuthConfig,
    client: reqwest::Client,
}

impl SupabaseAuthClient {
    /// Create a new client with the given configuration.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with default TLS).
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create HTTP client");

        Self { config, client }
    }

    async fn post(&self, url: &str, credentials: &Credentials) -> Result<reqwest::Response> {
        self.client
            .post(url)
            .header("apikey", &self.config.anon_key)
            .json(credentials)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))
    }

    /// Convert a non-success response into an `AuthError`.
    async fn error_from(response: reqwest::Response, flow: Flow) -> AuthError {
        let status = response.status().as_u16();
        let message = response
            .json::<RawError>()
            .await
            .unwrap_or_default()
            .into_message();

        match (status, flow) {
            (429, _) => AuthError::RateLimited,
            (400 | 401, Flow::SignIn) => AuthError::LoginFailed("invalid credentials".to_string()),
            (400 | 422, Flow::SignUp) => {
                AuthError::SignUpFailed(message.unwrap_or_else(|| "rejected".to_string()))
            }
            _ => {
                tracing::warn!(status, message = ?message, "Identity provider error");
                AuthError::Upstream(status)
            }
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthClient {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthSession> {
        let response = self.post(&self.config.signup_url(), credentials).await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response, Flow::SignUp).await);
        }

        let raw: RawSignUp = response
            .json()
            .await
            .map_err(|e| AuthError::Transport(format!("invalid response: {e}")))?;

        match raw {
            RawSignUp::Session(session) => session.into_session(),
            RawSignUp::User(user) => Ok(AuthSession {
                user: user.into_user()?,
                access_token: None,
                refresh_token: None,
                expires_at: None,
            }),
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession> {
        let response = self.post(&self.config.token_url(), credentials).await?;
        if !response.status().is_success() {
            return Err(Self::error_from(response, Flow::SignIn).await);
        }

        let raw: RawSession = response
            .json()
            .await
            .map_err(|e| AuthError::Transport(format!("invalid response: {e}")))?;

        raw.into_session()
    }
}

/// An in-memory identity provider for testing.
///
/// Issues tokens of the form `test-token:<identity_uuid>:<email>`, which
/// [`crate::MockJwtValidator`] accepts.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Default)]
pub struct MockIdentityProvider {
    accounts: parking_lot::Mutex<std::collections::HashMap<String, (String, IdentityId)>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockIdentityProvider {
    fn session(identity_id: IdentityId, email: &str) -> AuthSession {
        AuthSession {
            user: IdentityUser {
                identity_id,
                email: Some(email.to_string()),
            },
            access_token: Some(format!("test-token:{identity_id}:{email}")),
            refresh_token: Some(format!("refresh:{identity_id}")),
            expires_at: Some(Utc::now() + chrono::Duration::hours(1)),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthSession> {
        let mut accounts = self.accounts.lock();
        if accounts.contains_key(&credentials.email) {
            return Err(AuthError::SignUpFailed("User already registered".to_string()));
        }
        let identity_id = IdentityId::generate();
        accounts.insert(
            credentials.email.clone(),
            (credentials.password.clone(), identity_id),
        );
        Ok(Self::session(identity_id, &credentials.email))
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession> {
        let accounts = self.accounts.lock();
        match accounts.get(&credentials.email) {
            Some((password, identity_id)) if *password == credentials.password => {
                Ok(Self::session(*identity_id, &credentials.email))
            }
            _ => Err(AuthError::LoginFailed("invalid credentials".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const IDENTITY: &str = "550e8400-e29b-41d4-a716-446655440000";

    fn credentials() -> Credentials {
        Credentials {
            email: "ada@example.com".to_string(),
            password: "hunter22".to_string(),
        }
    }

    fn session_body() -> serde_json::Value {
        serde_json::json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": { "id": IDENTITY, "email": "ada@example.com" }
        })
    }

    #[test]
    fn credentials_serialize() {
        let json = serde_json::to_value(credentials()).unwrap();
        assert_eq!(json["email"], "ada@example.com");
        assert_eq!(json["password"], "hunter22");
    }

    #[tokio::test]
    async fn sign_in_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon"))
            .and(body_json(serde_json::json!({
                "email": "ada@example.com",
                "password": "hunter22"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(AuthConfig::new(server.uri(), "anon"));
        let session = client.sign_in(&credentials()).await.unwrap();

        assert_eq!(session.access_token.as_deref(), Some("jwt"));
        assert_eq!(session.user.identity_id.to_string(), IDENTITY);
        assert!(session.expires_at.is_some());
    }

    #[tokio::test]
    async fn sign_in_rejects_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(AuthConfig::new(server.uri(), "anon"));
        let result = client.sign_in(&credentials()).await;

        assert!(matches!(result, Err(AuthError::LoginFailed(_))));
    }

    #[tokio::test]
    async fn sign_up_without_confirmation_returns_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(AuthConfig::new(server.uri(), "anon"));
        let session = client.sign_up(&credentials()).await.unwrap();

        assert_eq!(session.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn sign_up_pending_confirmation_returns_user_only() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": IDENTITY,
                "email": "ada@example.com",
                "confirmation_sent_at": "2024-01-01T00:00:00Z"
            })))
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(AuthConfig::new(server.uri(), "anon"));
        let session = client.sign_up(&credentials()).await.unwrap();

        assert!(session.access_token.is_none());
        assert_eq!(session.user.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn sign_up_conflict_keeps_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "code": 422,
                "msg": "User already registered"
            })))
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(AuthConfig::new(server.uri(), "anon"));
        let result = client.sign_up(&credentials()).await;

        assert!(matches!(result, Err(AuthError::SignUpFailed(msg)) if msg == "User already registered"));
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(AuthConfig::new(server.uri(), "anon"));
        let result = client.sign_in(&credentials()).await;

        assert!(matches!(result, Err(AuthError::RateLimited)));
    }

    #[tokio::test]
    async fn provider_outage_is_an_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = SupabaseAuthClient::new(AuthConfig::new(server.uri(), "anon"));
        let result = client.sign_up(&credentials()).await;

        let err = result.unwrap_err();
        assert!(matches!(err, AuthError::Upstream(503)));
        assert_eq!(err.http_status_code(), 500);
    }

    #[tokio::test]
    async fn mock_provider_round_trip() {
        let provider = MockIdentityProvider::default();

        let created = provider.sign_up(&credentials()).await.unwrap();
        let signed_in = provider.sign_in(&credentials()).await.unwrap();
        assert_eq!(created.user.identity_id, signed_in.user.identity_id);

        let duplicate = provider.sign_up(&credentials()).await;
        assert!(matches!(duplicate, Err(AuthError::SignUpFailed(_))));

        let wrong = Credentials {
            password: "nope".to_string(),
            ..credentials()
        };
        assert!(matches!(
            provider.sign_in(&wrong).await,
            Err(AuthError::LoginFailed(_))
        ));
    }
}
