//! Integration tests against an in-process fake of the remote job and
//! profile stores, served over a real TCP port so the client under test
//! speaks actual HTTP.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::Utc;

use jobdeck_core::auth::{AuthState, StaticTokenProvider};
use jobdeck_core::client::{ApiClient, ApiError};
use jobdeck_core::models::{
    AdminProfileUpdate, Job, JobCreate, JobUpdate, ProfileUpdate, Role, UserProfile,
};
use jobdeck_core::profile_state::ProfileContext;
use jobdeck_core::sync::ProfileSynchronizer;

// ===========================================================================
// Fake store
// ===========================================================================

#[derive(Default)]
struct StoreState {
    jobs: Mutex<Vec<Job>>,
    next_job_id: AtomicI64,
    profiles: Mutex<Vec<UserProfile>>,
    next_profile_id: AtomicI64,
    /// Calls observed on POST /user-profiles/.
    profile_fetch_calls: AtomicU32,
    /// Remaining injected 500s for POST /user-profiles/.
    profile_fetch_failures_left: AtomicU32,
    /// Reject POST /user-profiles/ with 401 when set.
    reject_profile_fetch: AtomicBool,
}

fn bearer_subject(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "detail": message }))).into_response()
}

async fn list_jobs(State(state): State<Arc<StoreState>>) -> Response {
    Json(state.jobs.lock().unwrap().clone()).into_response()
}

async fn get_job(State(state): State<Arc<StoreState>>, Path(id): Path<i64>) -> Response {
    match state.jobs.lock().unwrap().iter().find(|j| j.id == id) {
        Some(job) => Json(job.clone()).into_response(),
        None => detail(
            StatusCode::NOT_FOUND,
            &format!("Job with id {id} not found"),
        ),
    }
}

async fn create_job(
    State(state): State<Arc<StoreState>>,
    headers: HeaderMap,
    Json(payload): Json<JobCreate>,
) -> Response {
    let Some(subject) = bearer_subject(&headers) else {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    };
    if payload.title.is_empty() {
        return detail(StatusCode::UNPROCESSABLE_ENTITY, "title must not be empty");
    }
    let job = Job {
        id: state.next_job_id.fetch_add(1, Ordering::SeqCst) + 1,
        title: payload.title,
        company: payload.company,
        location: payload.location,
        description: payload.description,
        posted_date: Utc::now().date_naive(),
        job_type: payload.job_type,
        url: payload.url,
        owner_user_id: Some(subject),
    };
    state.jobs.lock().unwrap().push(job.clone());
    (StatusCode::CREATED, Json(job)).into_response()
}

async fn update_job(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(payload): Json<JobUpdate>,
) -> Response {
    if bearer_subject(&headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    let mut jobs = state.jobs.lock().unwrap();
    let Some(job) = jobs.iter_mut().find(|j| j.id == id) else {
        return detail(
            StatusCode::NOT_FOUND,
            &format!("Job with id {id} not found"),
        );
    };
    if let Some(title) = payload.title {
        job.title = title;
    }
    if let Some(company) = payload.company {
        job.company = company;
    }
    if let Some(location) = payload.location {
        job.location = location;
    }
    if let Some(description) = payload.description {
        job.description = description;
    }
    if let Some(job_type) = payload.job_type {
        job.job_type = job_type;
    }
    if let Some(url) = payload.url {
        job.url = Some(url);
    }
    Json(job.clone()).into_response()
}

async fn delete_job(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    if bearer_subject(&headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    let mut jobs = state.jobs.lock().unwrap();
    let before = jobs.len();
    jobs.retain(|j| j.id != id);
    if jobs.len() == before {
        return detail(
            StatusCode::NOT_FOUND,
            &format!("Job with id {id} not found"),
        );
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn fetch_or_create_profile(
    State(state): State<Arc<StoreState>>,
    headers: HeaderMap,
) -> Response {
    state.profile_fetch_calls.fetch_add(1, Ordering::SeqCst);
    if state.reject_profile_fetch.load(Ordering::SeqCst) {
        return detail(StatusCode::UNAUTHORIZED, "Invalid token");
    }
    if state.profile_fetch_failures_left.load(Ordering::SeqCst) > 0 {
        state
            .profile_fetch_failures_left
            .fetch_sub(1, Ordering::SeqCst);
        return detail(
            StatusCode::INTERNAL_SERVER_ERROR,
            "profile store temporarily unavailable",
        );
    }
    let Some(subject) = bearer_subject(&headers) else {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    };

    let mut profiles = state.profiles.lock().unwrap();
    if let Some(profile) = profiles.iter().find(|p| p.user_id == subject) {
        return Json(profile.clone()).into_response();
    }
    let local = subject.rsplit('|').next().unwrap_or(&subject).to_string();
    let now = Utc::now();
    let profile = UserProfile {
        id: state.next_profile_id.fetch_add(1, Ordering::SeqCst) + 1,
        user_id: subject,
        email: format!("{local}@example.com"),
        full_name: None,
        profile_picture_url: None,
        bio: None,
        role: Role::User,
        created_at: now,
        updated_at: now,
    };
    profiles.push(profile.clone());
    (StatusCode::CREATED, Json(profile)).into_response()
}

async fn update_own_profile(
    State(state): State<Arc<StoreState>>,
    headers: HeaderMap,
    Json(payload): Json<ProfileUpdate>,
) -> Response {
    let Some(subject) = bearer_subject(&headers) else {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    };
    let mut profiles = state.profiles.lock().unwrap();
    let Some(profile) = profiles.iter_mut().find(|p| p.user_id == subject) else {
        return detail(StatusCode::NOT_FOUND, "User profile not found");
    };
    if let Some(full_name) = payload.full_name {
        profile.full_name = Some(full_name);
    }
    if let Some(picture) = payload.profile_picture_url {
        profile.profile_picture_url = Some(picture);
    }
    if let Some(bio) = payload.bio {
        profile.bio = Some(bio);
    }
    profile.updated_at = Utc::now();
    Json(profile.clone()).into_response()
}

async fn list_profiles(State(state): State<Arc<StoreState>>, headers: HeaderMap) -> Response {
    if bearer_subject(&headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    Json(state.profiles.lock().unwrap().clone()).into_response()
}

async fn admin_update_profile(
    State(state): State<Arc<StoreState>>,
    Path(user_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<AdminProfileUpdate>,
) -> Response {
    if bearer_subject(&headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    let mut profiles = state.profiles.lock().unwrap();
    let Some(profile) = profiles.iter_mut().find(|p| p.user_id == user_id) else {
        return detail(StatusCode::NOT_FOUND, "User profile not found");
    };
    if let Some(email) = payload.email {
        profile.email = email;
    }
    if let Some(full_name) = payload.full_name {
        profile.full_name = Some(full_name);
    }
    if let Some(picture) = payload.profile_picture_url {
        profile.profile_picture_url = Some(picture);
    }
    if let Some(bio) = payload.bio {
        profile.bio = Some(bio);
    }
    if let Some(role) = payload.role {
        profile.role = role;
    }
    profile.updated_at = Utc::now();
    Json(profile.clone()).into_response()
}

fn router(state: Arc<StoreState>) -> Router {
    Router::new()
        .route("/jobs/", get(list_jobs))
        .route("/jobs/create_protected", post(create_job))
        .route(
            "/jobs/{id}",
            get(get_job).put(update_job).delete(delete_job),
        )
        .route(
            "/user-profiles/",
            post(fetch_or_create_profile).get(list_profiles),
        )
        .route("/user-profiles/me", patch(update_own_profile))
        .route("/user-profiles/{user_id}", put(admin_update_profile))
        .with_state(state)
}

async fn spawn_store() -> (String, Arc<StoreState>) {
    let state = Arc::new(StoreState::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake store");
    });
    (format!("http://{addr}"), state)
}

fn client_for(base_url: &str, token: &str) -> ApiClient {
    ApiClient::new(base_url, Arc::new(StaticTokenProvider::new(token))).expect("client")
}

fn job_payload(title: &str) -> JobCreate {
    JobCreate {
        title: title.into(),
        company: "Acme".into(),
        location: "Remote".into(),
        description: "Build and run the platform".into(),
        job_type: "Full-time".into(),
        url: None,
    }
}

// ===========================================================================
// Job store
// ===========================================================================

#[tokio::test]
async fn create_then_list_shows_new_job() {
    let (base, _) = spawn_store().await;
    let client = client_for(&base, "auth0|alice");

    // Prime the job-list cache before the mutation.
    assert!(client.list_jobs().await.unwrap().is_empty());

    let created = client.create_job(&job_payload("Platform Engineer")).await.unwrap();
    assert_eq!(created.owner_user_id.as_deref(), Some("auth0|alice"));
    assert!(created.editable_by(Some("auth0|alice"), Some(Role::User)));
    assert!(!created.editable_by(Some("auth0|bob"), Some(Role::User)));

    let jobs = client.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].title, "Platform Engineer");
}

#[tokio::test]
async fn update_then_list_shows_latest_fields() {
    let (base, _) = spawn_store().await;
    let client = client_for(&base, "auth0|alice");

    let created = client.create_job(&job_payload("Engineer")).await.unwrap();
    client.list_jobs().await.unwrap();

    let update = JobUpdate {
        title: Some("Senior Engineer".into()),
        location: Some("Berlin".into()),
        ..Default::default()
    };
    client.update_job(created.id, &update).await.unwrap();

    let jobs = client.list_jobs().await.unwrap();
    assert_eq!(jobs[0].title, "Senior Engineer");
    assert_eq!(jobs[0].location, "Berlin");
    // Fields absent from the update are untouched.
    assert_eq!(jobs[0].company, "Acme");
}

#[tokio::test]
async fn delete_then_list_omits_job() {
    let (base, _) = spawn_store().await;
    let client = client_for(&base, "auth0|alice");

    let keep = client.create_job(&job_payload("Keeper")).await.unwrap();
    let gone = client.create_job(&job_payload("Doomed")).await.unwrap();
    client.list_jobs().await.unwrap();

    client.delete_job(gone.id).await.unwrap();

    let jobs = client.list_jobs().await.unwrap();
    assert_eq!(jobs.iter().map(|j| j.id).collect::<Vec<_>>(), vec![keep.id]);
}

#[tokio::test]
async fn missing_job_maps_to_not_found() {
    let (base, _) = spawn_store().await;
    let client = client_for(&base, "auth0|alice");

    match client.get_job(99).await {
        Err(ApiError::NotFound(message)) => assert!(message.contains("99")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn server_detail_message_propagates() {
    let (base, _) = spawn_store().await;
    let client = client_for(&base, "auth0|alice");

    match client.create_job(&job_payload("")).await {
        Err(ApiError::Server { status, message }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "title must not be empty");
        }
        other => panic!("expected Server error, got {other:?}"),
    }
}

// ===========================================================================
// Profile store
// ===========================================================================

#[tokio::test]
async fn own_profile_fetch_creates_then_serves_from_cache() {
    let (base, state) = spawn_store().await;
    let client = client_for(&base, "auth0|alice");
    let auth = AuthState::authenticated("auth0|alice");

    let profile = client.fetch_own_profile(&auth).await.unwrap();
    assert_eq!(profile.user_id, "auth0|alice");
    assert_eq!(profile.email, "alice@example.com");
    assert_eq!(profile.role, Role::User);

    // Second fetch within the staleness window never leaves the cache.
    client.fetch_own_profile(&auth).await.unwrap();
    assert_eq!(state.profile_fetch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn own_profile_update_round_trips() {
    let (base, state) = spawn_store().await;
    let client = client_for(&base, "auth0|alice");
    let auth = AuthState::authenticated("auth0|alice");

    client.fetch_own_profile(&auth).await.unwrap();

    let updated = client
        .update_own_profile(&ProfileUpdate {
            full_name: Some("X".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.full_name.as_deref(), Some("X"));

    // The mutation invalidated the cached entry, so this is a fresh read.
    let fresh = client.fetch_own_profile(&auth).await.unwrap();
    assert_eq!(fresh.full_name.as_deref(), Some("X"));
    assert_eq!(state.profile_fetch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn profile_fetch_retries_transient_failures() {
    let (base, state) = spawn_store().await;
    // Three consecutive 5xx responses still leave one retry in the budget.
    state.profile_fetch_failures_left.store(3, Ordering::SeqCst);
    let client = client_for(&base, "auth0|alice");

    let profile = client
        .fetch_own_profile(&AuthState::authenticated("auth0|alice"))
        .await
        .unwrap();
    assert_eq!(profile.user_id, "auth0|alice");
    assert_eq!(state.profile_fetch_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn profile_fetch_stops_after_attempt_budget() {
    let (base, state) = spawn_store().await;
    state.profile_fetch_failures_left.store(8, Ordering::SeqCst);
    let client = client_for(&base, "auth0|alice");

    match client
        .fetch_own_profile(&AuthState::authenticated("auth0|alice"))
        .await
    {
        Err(ApiError::Server { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected Server error, got {other:?}"),
    }
    // Initial attempt plus three retries, then the last error surfaces.
    assert_eq!(state.profile_fetch_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn profile_fetch_does_not_retry_unauthorized() {
    let (base, state) = spawn_store().await;
    state.reject_profile_fetch.store(true, Ordering::SeqCst);
    let client = client_for(&base, "auth0|alice");

    match client
        .fetch_own_profile(&AuthState::authenticated("auth0|alice"))
        .await
    {
        Err(ApiError::Server { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid token");
        }
        other => panic!("expected Server error, got {other:?}"),
    }
    assert_eq!(state.profile_fetch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn admin_role_change_reflected_in_next_listing() {
    let (base, _) = spawn_store().await;
    let admin = client_for(&base, "auth0|root");
    let bob = client_for(&base, "auth0|bob");
    let admin_auth = AuthState::authenticated("auth0|root");

    bob.fetch_own_profile(&AuthState::authenticated("auth0|bob"))
        .await
        .unwrap();

    // Prime the admin listing cache, then mutate.
    let before = admin.list_all_profiles(&admin_auth).await.unwrap();
    assert!(before.iter().all(|p| p.role == Role::User));

    admin
        .update_any_profile(&AdminProfileUpdate::set_role("auth0|bob", Role::Admin))
        .await
        .unwrap();

    let after = admin.list_all_profiles(&admin_auth).await.unwrap();
    let bob_profile = after.iter().find(|p| p.user_id == "auth0|bob").unwrap();
    assert_eq!(bob_profile.role, Role::Admin);
}

// ===========================================================================
// Synchronization
// ===========================================================================

#[tokio::test]
async fn synchronizer_stores_profile_for_signed_in_user() {
    let (base, _) = spawn_store().await;
    let client = client_for(&base, "auth0|alice");
    let ctx = ProfileContext::new();
    let state = ctx.init();

    ProfileSynchronizer::new(client)
        .run_once(&AuthState::authenticated("auth0|alice"), state)
        .await
        .unwrap();

    assert_eq!(
        state.profile().map(|p| p.user_id),
        Some("auth0|alice".to_string())
    );
    assert!(!state.is_loading());
}

#[tokio::test]
async fn synchronizer_clears_holder_on_logout_without_touching_store() {
    let (base, store) = spawn_store().await;
    let client = client_for(&base, "auth0|alice");
    let ctx = ProfileContext::new();
    let state = ctx.init();
    let sync = ProfileSynchronizer::new(client);

    sync.run_once(&AuthState::authenticated("auth0|alice"), state)
        .await
        .unwrap();
    assert!(state.profile().is_some());

    sync.run_once(&AuthState::unauthenticated(), state)
        .await
        .unwrap();
    assert!(state.profile().is_none());
    assert!(!state.is_loading());
    // The signed-in cycle issued the only fetch.
    assert_eq!(store.profile_fetch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn synchronizer_clears_holder_and_returns_fetch_error() {
    let (base, store) = spawn_store().await;
    store.reject_profile_fetch.store(true, Ordering::SeqCst);
    let client = client_for(&base, "auth0|alice");
    let ctx = ProfileContext::new();
    let state = ctx.init();

    let result = ProfileSynchronizer::new(client)
        .run_once(&AuthState::authenticated("auth0|alice"), state)
        .await;

    assert!(matches!(result, Err(ApiError::Server { status: 401, .. })));
    assert!(state.profile().is_none());
    assert!(!state.is_loading());
}

#[tokio::test]
async fn job_mutations_do_not_evict_profile_cache() {
    let (base, state) = spawn_store().await;
    let client = client_for(&base, "auth0|alice");
    let auth = AuthState::authenticated("auth0|alice");

    client.fetch_own_profile(&auth).await.unwrap();
    client.create_job(&job_payload("Engineer")).await.unwrap();
    client.fetch_own_profile(&auth).await.unwrap();

    assert_eq!(state.profile_fetch_calls.load(Ordering::SeqCst), 1);
}
