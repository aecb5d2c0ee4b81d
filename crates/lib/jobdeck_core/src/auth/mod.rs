//! Identity-provider state and token acquisition.
//!
//! The identity provider itself is external. This module holds the live
//! auth snapshot and the token-provider seam the data access layer pulls
//! bearer tokens through, just in time, for every protected call.

pub mod token;

pub use token::{
    ClientCredentialsProvider, StaticTokenProvider, TokenProvider, UnconfiguredTokenProvider,
};

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity provider rejected the token request.
    #[error("Auth provider error '{code}': {description}")]
    Provider { code: String, description: String },

    #[error("Token request failed: {0}")]
    Transport(String),

    #[error("Auth configuration error: {0}")]
    Config(String),
}

/// Live snapshot of identity-provider state.
///
/// Derived, never persisted: callers source it fresh for each evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub is_loading: bool,
    /// Identity subject (`sub` claim) once authenticated.
    pub subject: Option<String>,
}

impl AuthState {
    /// Signed out, auth settled.
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// Identity provider still resolving.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    /// Signed in as the given subject, auth settled.
    pub fn authenticated(subject: impl Into<String>) -> Self {
        Self {
            is_authenticated: true,
            is_loading: false,
            subject: Some(subject.into()),
        }
    }

    /// Auth has settled and the user is signed in; protected queries are
    /// enabled only in this state.
    pub fn resolved(&self) -> bool {
        self.is_authenticated && !self.is_loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_requires_settled_and_signed_in() {
        assert!(AuthState::authenticated("auth0|alice").resolved());
        assert!(!AuthState::loading().resolved());
        assert!(!AuthState::unauthenticated().resolved());
        let still_loading = AuthState {
            is_authenticated: true,
            is_loading: true,
            subject: Some("auth0|alice".into()),
        };
        assert!(!still_loading.resolved());
    }
}
