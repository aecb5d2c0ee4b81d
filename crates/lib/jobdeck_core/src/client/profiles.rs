//! Profile store operations.
//!
//! The own-profile fetch is "fetch or create": the store creates the
//! profile on the first authenticated call, so the POST is idempotent and
//! safe to retry. Mutations are never retried.
//!
//! Protected queries are gated on resolved auth: while the identity
//! provider is still loading or the user is signed out they return
//! [`ApiError::AuthUnresolved`] without acquiring a token or touching the
//! network.

use tokio::time::{Duration, sleep};
use tracing::{debug, warn};

use crate::auth::AuthState;
use crate::cache::{
    KEY_ALL_PROFILES, KEY_OWN_PROFILE, PROFILE_STALE_AFTER_SECS, TAG_PROFILE, TAG_PROFILES,
};
use crate::models::{AdminProfileUpdate, ProfileUpdate, UserProfile};

use super::{ApiClient, ApiError, read_json, transport};

/// Attempt budget for the idempotent own-profile fetch: the initial
/// attempt plus up to three retries.
const MAX_FETCH_ATTEMPTS: u32 = 4;

/// Whether a failed own-profile fetch is worth another attempt.
///
/// Unauthorized and not-found outcomes will not change on retry; transport
/// failures and server errors might.
fn retryable(err: &ApiError) -> bool {
    match err {
        ApiError::Transport(_) => true,
        ApiError::Server { status, .. } => !matches!(status, 401 | 403 | 404),
        ApiError::NotFound(_)
        | ApiError::Auth(_)
        | ApiError::AuthUnresolved
        | ApiError::Config(_) => false,
    }
}

impl ApiClient {
    /// Fetch the current user's profile, creating it server-side if absent.
    ///
    /// Cached for 5 minutes; retried up to three times after the initial
    /// attempt, never on unauthorized or not-found outcomes.
    pub async fn fetch_own_profile(&self, auth: &AuthState) -> Result<UserProfile, ApiError> {
        if !auth.resolved() {
            return Err(ApiError::AuthUnresolved);
        }
        if let Some(profile) = self.cache.read().await.get::<UserProfile>(KEY_OWN_PROFILE) {
            debug!("own profile served from cache");
            return Ok(profile);
        }

        let mut last_error = None;
        for attempt in 1..=MAX_FETCH_ATTEMPTS {
            match self.fetch_own_profile_once().await {
                Ok(profile) => {
                    self.cache.write().await.put(
                        KEY_OWN_PROFILE,
                        &profile,
                        &[TAG_PROFILE],
                        Some(chrono::Duration::seconds(PROFILE_STALE_AFTER_SECS)),
                    );
                    return Ok(profile);
                }
                Err(err) if !retryable(&err) => return Err(err),
                Err(err) => {
                    warn!(attempt, "own-profile fetch failed: {err}");
                    last_error = Some(err);
                }
            }
            if attempt < MAX_FETCH_ATTEMPTS {
                sleep(Duration::from_millis(100 * u64::from(attempt))).await;
            }
        }
        Err(last_error.unwrap_or_else(|| {
            ApiError::Transport(format!(
                "own-profile fetch failed after {MAX_FETCH_ATTEMPTS} attempts"
            ))
        }))
    }

    async fn fetch_own_profile_once(&self) -> Result<UserProfile, ApiError> {
        let token = self.bearer().await?;
        let url = self.endpoint("user-profiles/")?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport("fetching user profile"))?;
        read_json("fetching user profile", resp).await
    }

    /// Update the current user's name, bio, or picture (PATCH).
    /// Invalidates the own-profile cache entry on success.
    pub async fn update_own_profile(
        &self,
        payload: &ProfileUpdate,
    ) -> Result<UserProfile, ApiError> {
        let token = self.bearer().await?;
        let url = self.endpoint("user-profiles/me")?;
        let resp = self
            .http
            .patch(url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(transport("updating user profile"))?;
        let profile: UserProfile = read_json("updating user profile", resp).await?;
        self.cache.write().await.invalidate_tag(TAG_PROFILE);
        debug!(user_id = %profile.user_id, "own profile updated");
        Ok(profile)
    }

    /// Admin: list every user profile. Same resolved-auth gate as the own
    /// fetch; cached until an admin update invalidates it.
    pub async fn list_all_profiles(&self, auth: &AuthState) -> Result<Vec<UserProfile>, ApiError> {
        if !auth.resolved() {
            return Err(ApiError::AuthUnresolved);
        }
        if let Some(profiles) = self
            .cache
            .read()
            .await
            .get::<Vec<UserProfile>>(KEY_ALL_PROFILES)
        {
            debug!("profile listing served from cache");
            return Ok(profiles);
        }
        let token = self.bearer().await?;
        let url = self.endpoint("user-profiles/")?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport("listing user profiles"))?;
        let profiles: Vec<UserProfile> = read_json("listing user profiles", resp).await?;
        self.cache
            .write()
            .await
            .put(KEY_ALL_PROFILES, &profiles, &[TAG_PROFILES], None);
        Ok(profiles)
    }

    /// Admin: update any profile, including its role (PUT). Invalidates
    /// the admin listing on success.
    pub async fn update_any_profile(
        &self,
        payload: &AdminProfileUpdate,
    ) -> Result<UserProfile, ApiError> {
        let token = self.bearer().await?;
        let url = self.endpoint(&format!("user-profiles/{}", payload.user_id))?;
        let resp = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(transport("updating user profile (admin)"))?;
        let profile: UserProfile = read_json("updating user profile (admin)", resp).await?;
        self.cache.write().await.invalidate_tag(TAG_PROFILES);
        debug!(user_id = %profile.user_id, "profile updated by admin");
        Ok(profile)
    }
}
