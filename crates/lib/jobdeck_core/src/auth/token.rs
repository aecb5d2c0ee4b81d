//! Bearer token providers.
//!
//! Protected calls acquire their token through [`TokenProvider`] on every
//! request. The client-credentials provider performs the OAuth2 exchange
//! against the identity provider's token endpoint, caches the result, and
//! refreshes preemptively once most of the token lifetime has passed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::AuthError;

/// Refresh when 80% of the token lifetime has passed.
const REFRESH_THRESHOLD_PERCENT: f64 = 0.80;

/// Source of bearer tokens, scoped to the configured audience.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Acquire a bearer token for the API audience.
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Fixed pre-issued token, for CLI sessions and tests.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }
}

/// Provider used when no credentials are configured: every protected call
/// fails with a configuration error instead of reaching the network.
pub struct UnconfiguredTokenProvider;

#[async_trait]
impl TokenProvider for UnconfiguredTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        Err(AuthError::Config(
            "no access token configured; set JOBDECK_ACCESS_TOKEN or the JOBDECK_AUTH_* variables"
                .to_string(),
        ))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Error body shape of the identity provider's token endpoint.
#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

struct CachedToken {
    token: String,
    acquired_at: DateTime<Utc>,
    expires_in_secs: i64,
}

impl CachedToken {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        let elapsed = (now - self.acquired_at).num_seconds() as f64;
        elapsed >= self.expires_in_secs as f64 * REFRESH_THRESHOLD_PERCENT
    }
}

/// OAuth2 client-credentials exchange against the identity provider.
pub struct ClientCredentialsProvider {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    audience: String,
    cached: RwLock<Option<CachedToken>>,
}

impl ClientCredentialsProvider {
    pub fn new(
        domain: impl AsRef<str>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            token_url: format!("https://{}/oauth/token", domain.as_ref()),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            audience: audience.into(),
            cached: RwLock::new(None),
        }
    }

    async fn exchange(&self) -> Result<CachedToken, AuthError> {
        let resp = self
            .http
            .post(&self.token_url)
            .json(&serde_json::json!({
                "grant_type": "client_credentials",
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "audience": self.audience,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(match resp.json::<TokenErrorResponse>().await {
                Ok(body) => AuthError::Provider {
                    code: body.error,
                    description: body.error_description.unwrap_or_default(),
                },
                Err(_) => AuthError::Provider {
                    code: status.as_u16().to_string(),
                    description: "token endpoint returned an error".to_string(),
                },
            });
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Transport(format!("token response parse error: {e}")))?;

        Ok(CachedToken {
            token: body.access_token,
            acquired_at: Utc::now(),
            expires_in_secs: body.expires_in,
        })
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        if let Some(cached) = self.cached.read().await.as_ref()
            && !cached.needs_refresh(Utc::now())
        {
            return Ok(cached.token.clone());
        }

        debug!(audience = %self.audience, "acquiring access token");
        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *self.cached.write().await = Some(fresh);
        Ok(token)
    }
}
