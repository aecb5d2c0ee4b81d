//! # jobdeck_core
//!
//! Client core for the Jobdeck job board: the data model, the tagged query
//! cache, the typed API client over the remote job and profile stores, the
//! process-wide profile state holder, and the synchronization routine that
//! reconciles identity-provider state into it.

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod models;
pub mod profile_state;
pub mod sync;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
