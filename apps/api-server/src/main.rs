//! api-server: HTTP API for the Profile service.
//!
//! Serves CRUD endpoints for profiles under `/profiles` and supports local
//! dev with:
//! - Storage: In-memory, SQLite (file, `sqlite` feature, default) or DynamoDB
//!   (`dynamo` feature).
//! - Modes: `classic` mounts the HTTP routes, `demo` reseeds sample data on
//!   startup. Both may be active.
//! - CORS: Configurable via CORS_ALLOW_ORIGIN (origin string).
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # demo data on top of an in-memory store
//! APP_MODES=classic,demo STORAGE_PROVIDER=memory cargo run -p api-server
//!
//! # with Dynamo adapter enabled (requires AWS credentials)
//! STORAGE_PROVIDER=dynamo DYNAMO_TABLE_PROFILES=profiles \
//!   cargo run -p api-server --features dynamo
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;
mod listeners;
mod seed;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::http::HeaderValue;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use domain::adapters::memory_repo::InMemoryProfileRepo;
use domain::events::EventPublisher;
use domain::service::ProfileService;
use domain::{CoreError, Profile, ProfileId, ProfileRepository};
use serde::Deserialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Path prefix shared by every profile route.
const PROFILES_PATH: &str = "/profiles";

// Local repo abstraction over the compiled-in stores (feature-gated).
enum RepoKind {
    Memory(InMemoryProfileRepo),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteProfileRepo),
    #[cfg(feature = "dynamo")]
    Dynamo(aws_dynamo::DynamoProfileRepo),
}

#[derive(Clone)]
struct AnyRepo {
    kind: Arc<RepoKind>,
}

impl AnyRepo {
    fn new(kind: RepoKind) -> Self {
        Self {
            kind: Arc::new(kind),
        }
    }

    fn memory() -> Self {
        Self::new(RepoKind::Memory(InMemoryProfileRepo::new()))
    }

    fn backend(&self) -> &'static str {
        match &*self.kind {
            RepoKind::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(_) => "sqlite",
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(_) => "dynamo",
        }
    }
}

impl ProfileRepository for AnyRepo {
    async fn find_all(&self) -> Result<Vec<Profile>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.find_all().await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.find_all().await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.find_all().await,
        }
    }

    async fn find_by_id(&self, id: &ProfileId) -> Result<Option<Profile>, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.find_by_id(id).await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.find_by_id(id).await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.find_by_id(id).await,
        }
    }

    async fn save(&self, profile: Profile) -> Result<Profile, CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.save(profile).await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.save(profile).await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.save(profile).await,
        }
    }

    async fn delete_by_id(&self, id: &ProfileId) -> Result<(), CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.delete_by_id(id).await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.delete_by_id(id).await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.delete_by_id(id).await,
        }
    }

    async fn delete_all(&self) -> Result<(), CoreError> {
        match &*self.kind {
            RepoKind::Memory(r) => r.delete_all().await,
            #[cfg(feature = "sqlite")]
            RepoKind::Sqlite(r) => r.delete_all().await,
            #[cfg(feature = "dynamo")]
            RepoKind::Dynamo(r) => r.delete_all().await,
        }
    }
}

struct AppState<R: ProfileRepository> {
    profiles: Arc<ProfileService<R>>,
}

impl<R: ProfileRepository> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            profiles: Arc::clone(&self.profiles),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_unusual();

    let repo = build_repo(&cfg).await;
    info!(backend = repo.backend(), modes = ?cfg.modes, "profile store ready");

    let events = Arc::new(EventPublisher::new());
    events.subscribe(Arc::new(listeners::LoggingListener));
    let state = AppState {
        profiles: Arc::new(ProfileService::new(repo, events)),
    };

    let app = build_app(&cfg, state.clone());

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, "api-server listening");

    // The socket is bound: this is the one and only "ready" point of the process.
    spawn_demo_seeding(&cfg, &state.profiles);

    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

/// Assemble the full application: profile routes when `classic` is active,
/// request-id and trace layers, then CORS.
fn build_app<R: ProfileRepository + 'static>(cfg: &config::Config, state: AppState<R>) -> Router {
    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app: Router<AppState<R>> = Router::new();
    if cfg.is_active(config::AppMode::Classic) {
        app = app.merge(profile_routes());
    }
    let app = app
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .with_state(state);

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    app.layer(cors)
}

/// Start the sample data seeder in the background when `demo` is active.
/// Call once, after the listener is bound.
fn spawn_demo_seeding<R: ProfileRepository + 'static>(
    cfg: &config::Config,
    profiles: &Arc<ProfileService<R>>,
) -> Option<tokio::task::JoinHandle<()>> {
    if !cfg.is_active(config::AppMode::Demo) {
        return None;
    }
    let profiles = Arc::clone(profiles);
    Some(tokio::spawn(async move {
        if let Err(e) = seed::seed_sample_data(profiles.repository()).await {
            error!(err = ?e, "sample data seeding failed");
        }
    }))
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

// Construct a repository instance based on config and feature flags.
async fn build_repo(cfg: &config::Config) -> AnyRepo {
    match &cfg.storage_provider {
        #[cfg(feature = "sqlite")]
        config::StorageProvider::Sqlite => {
            match sqlite_adapter::SqliteProfileRepo::open_creating_dirs(&cfg.db_path) {
                Ok(r) => AnyRepo::new(RepoKind::Sqlite(r)),
                Err(e) => {
                    error!(path = %cfg.db_path.display(), err = %e, "failed to open sqlite store, using memory");
                    AnyRepo::memory()
                }
            }
        }
        #[cfg(feature = "dynamo")]
        config::StorageProvider::Dynamo => {
            // Presence is validated in Config::from_lookup()
            let table = cfg.dynamo_table.clone().unwrap_or_default();
            let repo = aws_dynamo::DynamoProfileRepo::new(table).await;
            info!(table = repo.table(), "using dynamo table");
            AnyRepo::new(RepoKind::Dynamo(repo))
        }
        config::StorageProvider::Memory => AnyRepo::memory(),
        #[allow(unreachable_patterns)]
        other => {
            warn!(provider = ?other, "storage backend not compiled in, using memory");
            AnyRepo::memory()
        }
    }
}

fn profile_routes<R: ProfileRepository + 'static>() -> Router<AppState<R>> {
    Router::new()
        .route(
            PROFILES_PATH,
            get(list_profiles::<R>).post(create_profile::<R>),
        )
        .route(
            &format!("{}/:id", PROFILES_PATH),
            get(get_profile::<R>)
                .put(update_profile::<R>)
                .delete(delete_profile::<R>),
        )
}

/// Body accepted by create and update. Any `id` sent by the client is ignored.
#[derive(Deserialize)]
struct ProfileReq {
    email: String,
}

fn bad_request(rejection: JsonRejection) -> Response {
    warn!(err = %rejection.body_text(), "malformed profile body");
    (
        StatusCode::BAD_REQUEST,
        Json(http_common::json_error_with_message(
            "bad_request",
            &rejection.body_text(),
        )),
    )
        .into_response()
}

fn invalid_id() -> Response {
    warn!("bad profile id in path");
    (
        StatusCode::BAD_REQUEST,
        Json(http_common::json_err("invalid_id")),
    )
        .into_response()
}

fn store_error(op: &'static str, e: CoreError) -> Response {
    error!(op, err = ?e, "store error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(http_common::json_err("internal")),
    )
        .into_response()
}

async fn list_profiles<R: ProfileRepository>(State(state): State<AppState<R>>) -> Response {
    match state.profiles.all().await {
        Ok(profiles) => {
            info!(count = profiles.len(), "list ok");
            Json(profiles).into_response()
        }
        Err(e) => store_error("list", e),
    }
}

async fn get_profile<R: ProfileRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = ProfileId::new(id) else {
        return invalid_id();
    };
    match state.profiles.get(&id).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => {
            info!(id = %id, "get: no such profile");
            StatusCode::OK.into_response()
        }
        Err(e) => store_error("get", e),
    }
}

async fn create_profile<R: ProfileRepository>(
    State(state): State<AppState<R>>,
    body: Result<Json<ProfileReq>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_request(rejection),
    };

    match state.profiles.create(&body.email).await {
        Ok(profile) => {
            let Some(id) = profile.id.as_ref() else {
                return store_error(
                    "create",
                    CoreError::Repository("store returned a profile without id".into()),
                );
            };
            info!(id = %id, "create ok");
            let location = http_common::location_for(PROFILES_PATH, id.as_str());
            (
                StatusCode::CREATED,
                [(header::LOCATION, location)],
                Json(profile),
            )
                .into_response()
        }
        Err(e) => store_error("create", e),
    }
}

// Success answers with an empty body whether or not the profile existed;
// clients re-GET to observe the new state.
async fn update_profile<R: ProfileRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
    body: Result<Json<ProfileReq>, JsonRejection>,
) -> Response {
    let Ok(id) = ProfileId::new(id) else {
        return invalid_id();
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return bad_request(rejection),
    };

    match state.profiles.update(&id, &body.email).await {
        Ok(Some(_)) => {
            info!(id = %id, "update ok");
            StatusCode::OK.into_response()
        }
        Ok(None) => {
            info!(id = %id, "update: no such profile");
            StatusCode::OK.into_response()
        }
        Err(e) => store_error("update", e),
    }
}

async fn delete_profile<R: ProfileRepository>(
    State(state): State<AppState<R>>,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = ProfileId::new(id) else {
        return invalid_id();
    };
    match state.profiles.delete(&id).await {
        Ok(Some(profile)) => {
            info!(id = %id, "delete ok");
            Json(profile).into_response()
        }
        Ok(None) => {
            info!(id = %id, "delete: no such profile");
            StatusCode::OK.into_response()
        }
        Err(e) => store_error("delete", e),
    }
}
