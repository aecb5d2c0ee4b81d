//! Environment-driven client configuration.

use std::env;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::auth::{
    ClientCredentialsProvider, StaticTokenProvider, TokenProvider, UnconfiguredTokenProvider,
};

/// Default API base URL (local backend).
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {name}: {reason}")]
    Invalid {
        name: &'static str,
        reason: String,
    },

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// How bearer tokens are acquired.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// Pre-issued token from the environment.
    Static { token: String },
    /// OAuth2 client-credentials exchange against the identity provider.
    ClientCredentials {
        domain: String,
        client_id: String,
        client_secret: String,
        audience: String,
    },
}

/// Client configuration, read from `JOBDECK_*` environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub token_source: Option<TokenSource>,
}

impl ClientConfig {
    /// Read configuration from the environment.
    ///
    /// `JOBDECK_ACCESS_TOKEN` wins over the client-credentials block. With
    /// neither set, only unauthenticated operations are available.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url =
            env::var("JOBDECK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Url::parse(&api_base_url).map_err(|e| ConfigError::Invalid {
            name: "JOBDECK_API_URL",
            reason: e.to_string(),
        })?;

        let token_source = match non_empty_var("JOBDECK_ACCESS_TOKEN") {
            Some(token) => Some(TokenSource::Static { token }),
            None => client_credentials_from_env()?,
        };

        Ok(Self {
            api_base_url,
            token_source,
        })
    }

    /// Whether any credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.token_source.is_some()
    }

    /// Build the token provider for this configuration. Without
    /// credentials the provider fails on first use with a config error.
    pub fn token_provider(&self) -> Arc<dyn TokenProvider> {
        match &self.token_source {
            Some(TokenSource::Static { token }) => {
                Arc::new(StaticTokenProvider::new(token.clone()))
            }
            Some(TokenSource::ClientCredentials {
                domain,
                client_id,
                client_secret,
                audience,
            }) => Arc::new(ClientCredentialsProvider::new(
                domain,
                client_id.clone(),
                client_secret.clone(),
                audience.clone(),
            )),
            None => Arc::new(UnconfiguredTokenProvider),
        }
    }
}

fn non_empty_var(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn client_credentials_from_env() -> Result<Option<TokenSource>, ConfigError> {
    let Some(domain) = non_empty_var("JOBDECK_AUTH_DOMAIN") else {
        return Ok(None);
    };
    let client_id = non_empty_var("JOBDECK_AUTH_CLIENT_ID")
        .ok_or(ConfigError::Missing("JOBDECK_AUTH_CLIENT_ID"))?;
    let client_secret = non_empty_var("JOBDECK_AUTH_CLIENT_SECRET")
        .ok_or(ConfigError::Missing("JOBDECK_AUTH_CLIENT_SECRET"))?;
    let audience = non_empty_var("JOBDECK_AUTH_AUDIENCE")
        .ok_or(ConfigError::Missing("JOBDECK_AUTH_AUDIENCE"))?;
    Ok(Some(TokenSource::ClientCredentials {
        domain,
        client_id,
        client_secret,
        audience,
    }))
}
