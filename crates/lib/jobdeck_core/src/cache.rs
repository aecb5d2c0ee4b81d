//! In-memory query cache with tag-based invalidation and a staleness clock.
//!
//! An explicit key→entry map standing in for the query-caching library the
//! browser client would use: each entry carries a tag list and optionally
//! goes stale after a duration. Mutations invalidate by tag; reads serve
//! only fresh entries.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Cache key for the job listing.
pub const KEY_JOB_LIST: &str = "jobs:list";
/// Cache key for the current user's profile.
pub const KEY_OWN_PROFILE: &str = "profile:me";
/// Cache key for the admin profile listing.
pub const KEY_ALL_PROFILES: &str = "profiles:all";

/// Tag carried by job-collection entries.
pub const TAG_JOBS: &str = "jobs";
/// Tag carried by the own-profile entry.
pub const TAG_PROFILE: &str = "profile";
/// Tag carried by the admin profile listing.
pub const TAG_PROFILES: &str = "profiles";

/// The own-profile entry goes stale after 5 minutes.
pub const PROFILE_STALE_AFTER_SECS: i64 = 300;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    tags: Vec<String>,
    inserted_at: DateTime<Utc>,
    /// `None` means fresh until invalidated.
    stale_after: Option<Duration>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.stale_after {
            None => true,
            Some(window) => now - self.inserted_at < window,
        }
    }
}

/// In-memory query cache keyed by fixed operation strings.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<String, CacheEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached value if it exists and is still fresh.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.entries.get(key)?;
        if !entry.is_fresh(Utc::now()) {
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Insert or replace an entry.
    pub fn put<T: Serialize>(
        &mut self,
        key: &str,
        value: &T,
        tags: &[&str],
        stale_after: Option<Duration>,
    ) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "dropping uncacheable value: {e}");
                return;
            }
        };
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                inserted_at: Utc::now(),
                stale_after,
            },
        );
    }

    /// Remove every entry carrying the given tag.
    pub fn invalidate_tag(&mut self, tag: &str) {
        self.entries
            .retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
    }

    /// Remove a specific entry.
    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
