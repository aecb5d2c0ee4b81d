//! Command-line interface definition.

use clap::{Parser, Subcommand};
use jobdeck_core::models::Role;

#[derive(Parser)]
#[command(name = "jobdeck", about = "Job board client", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Browse and manage job postings.
    Jobs {
        #[command(subcommand)]
        command: JobsCommand,
    },
    /// Show or update your profile.
    Profile {
        #[command(subcommand)]
        command: ProfileCommand,
    },
    /// Administration (requires the admin role).
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Print the version.
    Version,
}

#[derive(Subcommand)]
pub enum JobsCommand {
    /// List job postings.
    List {
        /// Filter by title, company, or description.
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a single job posting.
    Get { id: i64 },
    /// Create a job posting (requires authentication).
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        company: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        description: String,
        #[arg(long = "job-type")]
        job_type: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Update a posting you own (admins may update any).
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "job-type")]
        job_type: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Delete a posting you own (admins may delete any).
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Fetch (or create) and print your profile.
    Show,
    /// Update your profile fields.
    Update {
        #[arg(long = "full-name")]
        full_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long = "picture-url")]
        picture_url: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// List every user profile.
    ListUsers,
    /// Change a user's role.
    SetRole { user_id: String, role: Role },
}
