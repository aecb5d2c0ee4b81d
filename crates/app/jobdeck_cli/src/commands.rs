//! Command implementations.

use jobdeck_core::auth::AuthState;
use jobdeck_core::client::ApiClient;
use jobdeck_core::config::ClientConfig;
use jobdeck_core::models::{
    AdminProfileUpdate, Job, JobCreate, JobUpdate, ProfileUpdate, Role, UserProfile,
};
use jobdeck_core::profile_state::ProfileContext;
use jobdeck_core::sync::ProfileSynchronizer;

use crate::cli::{AdminCommand, Cli, Commands, JobsCommand, ProfileCommand};
use crate::{Error, Result};

/// One CLI invocation: client, auth snapshot, and the profile context
/// wired at startup.
struct Session {
    client: ApiClient,
    auth: AuthState,
    profiles: ProfileContext,
}

impl Session {
    fn new() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        // A headless session has no redirect flow: holding credentials is
        // being signed in, and the subject comes from the fetched profile.
        let auth = if config.has_credentials() {
            AuthState {
                is_authenticated: true,
                is_loading: false,
                subject: None,
            }
        } else {
            AuthState::unauthenticated()
        };
        let client = ApiClient::new(&config.api_base_url, config.token_provider())?;
        let profiles = ProfileContext::new();
        profiles.init();
        Ok(Self {
            client,
            auth,
            profiles,
        })
    }

    /// Synchronize the holder and return the current profile, if any.
    /// Sync failures degrade to an anonymous view instead of aborting.
    async fn current_profile(&self) -> Option<UserProfile> {
        let sync = ProfileSynchronizer::new(self.client.clone());
        if let Err(e) = sync.run_once(&self.auth, self.profiles.get()).await {
            log::warn!("profile sync failed: {e}");
        }
        self.profiles.get().profile()
    }

    /// Synchronize the holder, propagating any fetch error.
    async fn require_profile(&self) -> Result<UserProfile> {
        let sync = ProfileSynchronizer::new(self.client.clone());
        sync.run_once(&self.auth, self.profiles.get()).await?;
        self.profiles.get().profile().ok_or_else(|| {
            Error::Custom(
                "not signed in; set JOBDECK_ACCESS_TOKEN or the JOBDECK_AUTH_* variables"
                    .to_string(),
            )
        })
    }
}

pub async fn dispatch(args: Cli) -> Result<()> {
    let session = Session::new()?;
    match args.command {
        Commands::Jobs { command } => jobs(&session, command).await,
        Commands::Profile { command } => profile(&session, command).await,
        Commands::Admin { command } => admin(&session, command).await,
        // Handled before the session is built.
        Commands::Version => Ok(()),
    }
}

// ===========================================================================
// Jobs
// ===========================================================================

async fn jobs(session: &Session, command: JobsCommand) -> Result<()> {
    match command {
        JobsCommand::List { search } => list_jobs(session, search).await,
        JobsCommand::Get { id } => {
            let job = session.client.get_job(id).await?;
            print_job(&job);
            Ok(())
        }
        JobsCommand::Create {
            title,
            company,
            location,
            description,
            job_type,
            url,
        } => {
            let payload = JobCreate {
                title,
                company,
                location,
                description,
                job_type,
                url,
            };
            let job = session.client.create_job(&payload).await?;
            println!("Created job #{}: {}", job.id, job.title);
            Ok(())
        }
        JobsCommand::Update {
            id,
            title,
            company,
            location,
            description,
            job_type,
            url,
        } => {
            let payload = JobUpdate {
                title,
                company,
                location,
                description,
                job_type,
                url,
            };
            if payload == JobUpdate::default() {
                return Err(Error::Custom("nothing to update".to_string()));
            }
            let job = session.client.update_job(id, &payload).await?;
            println!("Updated job #{}: {}", job.id, job.title);
            Ok(())
        }
        JobsCommand::Delete { id } => {
            session.client.delete_job(id).await?;
            println!("Deleted job #{id}");
            Ok(())
        }
    }
}

async fn list_jobs(session: &Session, search: Option<String>) -> Result<()> {
    let jobs = session.client.list_jobs().await?;
    let profile = if session.auth.resolved() {
        session.current_profile().await
    } else {
        None
    };
    let subject = profile.as_ref().map(|p| p.user_id.clone());
    let role = profile.as_ref().map(|p| p.role);

    let jobs: Vec<Job> = match &search {
        Some(term) => jobs.into_iter().filter(|j| j.matches(term)).collect(),
        None => jobs,
    };
    if jobs.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }
    for job in &jobs {
        let marker = if job.editable_by(subject.as_deref(), role) {
            "  [editable]"
        } else {
            ""
        };
        println!(
            "#{} {} at {} ({}, {}){}",
            job.id, job.title, job.company, job.location, job.job_type, marker
        );
    }
    Ok(())
}

fn print_job(job: &Job) {
    println!("#{} {}", job.id, job.title);
    println!("  Company:  {}", job.company);
    println!("  Location: {}", job.location);
    println!("  Type:     {}", job.job_type);
    println!("  Posted:   {}", job.posted_date);
    if let Some(url) = &job.url {
        println!("  URL:      {url}");
    }
    println!("  {}", job.description);
}

// ===========================================================================
// Profile
// ===========================================================================

async fn profile(session: &Session, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::Show => {
            let profile = session.require_profile().await?;
            print_profile(&profile);
            Ok(())
        }
        ProfileCommand::Update {
            full_name,
            bio,
            picture_url,
        } => {
            if full_name.is_none() && bio.is_none() && picture_url.is_none() {
                return Err(Error::Custom("nothing to update".to_string()));
            }
            let payload = ProfileUpdate {
                full_name,
                profile_picture_url: picture_url,
                bio,
            };
            let profile = session.client.update_own_profile(&payload).await?;
            println!("Profile updated.");
            print_profile(&profile);
            Ok(())
        }
    }
}

fn print_profile(profile: &UserProfile) {
    println!("{} <{}>", profile.user_id, profile.email);
    println!("  Role: {}", profile.role);
    if let Some(name) = &profile.full_name {
        println!("  Name: {name}");
    }
    if let Some(bio) = &profile.bio {
        println!("  Bio:  {bio}");
    }
    if let Some(picture) = &profile.profile_picture_url {
        println!("  Picture: {picture}");
    }
}

// ===========================================================================
// Admin
// ===========================================================================

async fn admin(session: &Session, command: AdminCommand) -> Result<()> {
    // The admin link is only rendered for admins; the server enforces the
    // role on the call itself.
    let me = session.require_profile().await?;
    if me.role != Role::Admin {
        return Err(Error::Custom(
            "admin commands require the admin role".to_string(),
        ));
    }
    match command {
        AdminCommand::ListUsers => {
            let profiles = session.client.list_all_profiles(&session.auth).await?;
            for profile in &profiles {
                println!(
                    "{}  {}  {}  {}",
                    profile.id,
                    profile.user_id,
                    profile.email,
                    profile.role
                );
            }
            Ok(())
        }
        AdminCommand::SetRole { user_id, role } => {
            let updated = session
                .client
                .update_any_profile(&AdminProfileUpdate::set_role(user_id, role))
                .await?;
            println!("{} is now {}", updated.user_id, updated.role);
            Ok(())
        }
    }
}
