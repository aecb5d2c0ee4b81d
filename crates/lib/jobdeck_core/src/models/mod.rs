//! Domain models shared by the client, cache, and views.

pub mod job;
pub mod profile;

pub use job::{Job, JobCreate, JobUpdate};
pub use profile::{AdminProfileUpdate, ProfileUpdate, Role, UserProfile};
