//! Data access layer over the remote job and profile stores.
//!
//! Typed, cached operations over the documented REST surface. Reads serve
//! fresh cache entries before touching the network; mutations invalidate
//! exactly the cache tags they could have staled, and only after a success
//! response is observed.

pub mod jobs;
pub mod profiles;

use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

use crate::auth::{AuthError, TokenProvider};
use crate::cache::QueryCache;

/// Errors surfaced by the data access layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response received.
    #[error("Could not reach the server: {0}")]
    Transport(String),

    /// Non-2xx response, carrying the server's `detail` message when the
    /// body had one.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Explicit 404, kept apart so views can render a not-found state.
    #[error("{0}")]
    NotFound(String),

    /// Token acquisition failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The call was issued while identity-provider state was unresolved;
    /// nothing was sent.
    #[error("Authentication state is still resolving")]
    AuthUnresolved,

    #[error("Invalid API base URL: {0}")]
    Config(String),
}

/// Client for the remote job and profile stores.
///
/// Cheap to clone; the HTTP pool, token provider, and query cache are
/// shared between clones.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
    cache: Arc<RwLock<QueryCache>>,
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Config(format!("{base_url}: {e}")))?;
        // Relative joins below need the trailing slash.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            tokens,
            cache: Arc::new(RwLock::new(QueryCache::new())),
        })
    }

    /// Shared query cache, for views and tests that inspect or prime it.
    pub fn cache(&self) -> Arc<RwLock<QueryCache>> {
        self.cache.clone()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Config(format!("{path}: {e}")))
    }

    async fn bearer(&self) -> Result<String, ApiError> {
        Ok(self.tokens.access_token().await?)
    }
}

/// Error body shape used by both stores.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

/// Map a non-2xx response to an [`ApiError`], preferring the body's
/// `detail` message over a generic status line.
async fn error_from_response(operation: &str, resp: Response) -> ApiError {
    let status = resp.status();
    let message = match resp.json::<ErrorBody>().await {
        Ok(ErrorBody {
            detail: Some(detail),
        }) => detail,
        _ => format!("HTTP {status} while {operation}"),
    };
    if status == StatusCode::NOT_FOUND {
        ApiError::NotFound(message)
    } else {
        ApiError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

/// Decode a success body, or map the failure.
async fn read_json<T: DeserializeOwned>(operation: &str, resp: Response) -> Result<T, ApiError> {
    if !resp.status().is_success() {
        return Err(error_from_response(operation, resp).await);
    }
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Transport(format!("invalid response while {operation}: {e}")))
}

fn transport(operation: &'static str) -> impl FnOnce(reqwest::Error) -> ApiError {
    move |e| ApiError::Transport(format!("{operation}: {e}"))
}
