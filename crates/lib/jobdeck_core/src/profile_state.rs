//! Process-wide holder for the signed-in user's profile.
//!
//! An explicit context object with an application-lifetime scope: wired
//! once at startup via [`ProfileContext::init`], never torn down, and
//! injected into consumers. Reading it before it is wired is a programming
//! error, so the accessor fails fast instead of returning a default.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::models::UserProfile;

/// Holder for the current profile and its loading flag.
///
/// Only the synchronization routine writes it; any consumer may read it.
#[derive(Debug)]
pub struct ProfileState {
    profile: RwLock<Option<UserProfile>>,
    is_loading: AtomicBool,
}

impl ProfileState {
    fn new() -> Self {
        Self {
            profile: RwLock::new(None),
            // Loading until the first reconciliation settles.
            is_loading: AtomicBool::new(true),
        }
    }

    /// Current profile, if one is stored.
    pub fn profile(&self) -> Option<UserProfile> {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_profile(&self, profile: Option<UserProfile>) {
        debug!(stored = profile.is_some(), "profile holder written");
        *self
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner) = profile;
    }

    /// True while either auth state or the profile fetch is unsettled.
    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub fn set_loading(&self, loading: bool) {
        self.is_loading.store(loading, Ordering::SeqCst);
    }
}

/// Uninitialized-until-wired context around [`ProfileState`].
///
/// Create one at the application root, call [`init`](Self::init) during
/// startup, and hand references to consumers.
#[derive(Debug, Default)]
pub struct ProfileContext {
    state: OnceLock<ProfileState>,
}

impl ProfileContext {
    pub const fn new() -> Self {
        Self {
            state: OnceLock::new(),
        }
    }

    /// Wire the context. The first call creates the holder; later calls
    /// return the same instance.
    pub fn init(&self) -> &ProfileState {
        self.state.get_or_init(ProfileState::new)
    }

    /// Fail-fast accessor.
    ///
    /// # Panics
    ///
    /// Panics if [`init`](Self::init) has not run; reading the holder
    /// without wiring it into startup is a bug in the caller, not a
    /// recoverable condition.
    pub fn get(&self) -> &ProfileState {
        self.state
            .get()
            .expect("ProfileContext accessed before init(); wire it at application startup")
    }
}
