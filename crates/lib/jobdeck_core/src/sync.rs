//! Synchronization of identity-provider and profile-fetch state into the
//! profile holder.
//!
//! The reconciliation rule is a pure precedence-ordered function, kept
//! apart from any fetch machinery so it is testable in isolation. The
//! synchronizer drives one gate → fetch → reconcile → apply cycle around
//! it and is re-run whenever an input changes.

use tracing::debug;

use crate::auth::AuthState;
use crate::client::{ApiClient, ApiError};
use crate::models::UserProfile;
use crate::profile_state::ProfileState;

/// Outcome flags of the most recent own-profile fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchState {
    pub is_loading: bool,
    pub is_success: bool,
    pub is_error: bool,
    pub profile: Option<UserProfile>,
}

impl FetchState {
    /// No fetch issued (gate closed or not yet started).
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    pub fn success(profile: UserProfile) -> Self {
        Self {
            is_success: true,
            profile: Some(profile),
            ..Self::default()
        }
    }

    pub fn error() -> Self {
        Self {
            is_error: true,
            ..Self::default()
        }
    }
}

/// Inputs to one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileInputs {
    pub auth: AuthState,
    pub fetch: FetchState,
}

/// What to write into the holder's profile slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileWrite {
    /// Leave the stored profile untouched.
    Keep,
    /// Store this profile.
    Store(UserProfile),
    /// Clear the stored profile.
    Clear,
}

/// The write to apply to the profile holder.
#[derive(Debug, Clone, PartialEq)]
pub struct HolderUpdate {
    pub profile: ProfileWrite,
    pub is_loading: bool,
}

impl HolderUpdate {
    pub fn apply_to(self, state: &ProfileState) {
        match self.profile {
            ProfileWrite::Keep => {}
            ProfileWrite::Store(profile) => state.set_profile(Some(profile)),
            ProfileWrite::Clear => state.set_profile(None),
        }
        state.set_loading(self.is_loading);
    }
}

/// Precedence-ordered reconciliation rule.
///
/// Signed-out wins over everything else, so the holder can never expose a
/// stale profile after logout even if a fetch from before logout is still
/// settling. The final arm is a fallback for an inconsistent intermediate
/// state: authenticated and settled, yet no success or error signal.
pub fn reconcile(inputs: &ReconcileInputs) -> HolderUpdate {
    let ReconcileInputs { auth, fetch } = inputs;

    if !auth.is_authenticated && !auth.is_loading {
        return HolderUpdate {
            profile: ProfileWrite::Clear,
            is_loading: false,
        };
    }
    if auth.is_loading {
        return HolderUpdate {
            profile: ProfileWrite::Keep,
            is_loading: true,
        };
    }
    if fetch.is_loading {
        return HolderUpdate {
            profile: ProfileWrite::Keep,
            is_loading: true,
        };
    }
    if fetch.is_success
        && let Some(profile) = &fetch.profile
    {
        return HolderUpdate {
            profile: ProfileWrite::Store(profile.clone()),
            is_loading: false,
        };
    }
    if fetch.is_error {
        return HolderUpdate {
            profile: ProfileWrite::Clear,
            is_loading: false,
        };
    }
    HolderUpdate {
        profile: ProfileWrite::Clear,
        is_loading: false,
    }
}

/// Drives reconciliation cycles against the live auth snapshot.
pub struct ProfileSynchronizer {
    client: ApiClient,
}

impl ProfileSynchronizer {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Run one cycle: evaluate the gate, fetch when it is open, and fold
    /// the outcome into the holder.
    ///
    /// A fetch error is returned to the caller for display; the holder
    /// itself only ever reflects it as a cleared profile.
    pub async fn run_once(
        &self,
        auth: &AuthState,
        state: &ProfileState,
    ) -> Result<(), ApiError> {
        let (fetch, error) = if auth.resolved() {
            match self.client.fetch_own_profile(auth).await {
                Ok(profile) => (FetchState::success(profile), None),
                Err(err) => (FetchState::error(), Some(err)),
            }
        } else {
            (FetchState::idle(), None)
        };

        let update = reconcile(&ReconcileInputs {
            auth: auth.clone(),
            fetch,
        });
        debug!(loading = update.is_loading, "applying reconciled update");
        update.apply_to(state);

        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
