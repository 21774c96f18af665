//! HTTP server: router, layers and startup.

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod render;
pub mod schema;


use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{
        header::{HeaderName, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
        HeaderValue, Request,
    },
    middleware,
    routing::get,
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer,
    set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer},
    trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;

use crate::{
    auth::{
        gateway::{require_login, resolve_session},
        memory::{MemorySessionStore, MemoryUserStore},
        spawn_session_reaper,
        storage::{PgSessionStore, PgUserStore},
        Credentials, PasswordHasher, SessionConfig, Sessions,
    },
    notes::{memory::MemoryNoteStore, storage::PgNoteStore, Notes},
};
use handlers::{health, logout, members, notes, root, search, user_login, user_register};
use render::Renderer;

/// Collaborators shared by every request.
#[derive(Clone)]
pub struct Services {
    pub credentials: Arc<Credentials>,
    pub sessions: Arc<Sessions>,
    pub notes: Arc<Notes>,
    pub renderer: Arc<Renderer>,
}

impl Services {
    /// Wire the Postgres-backed stores.
    ///
    /// # Errors
    /// Returns an error if the renderer cannot be built.
    pub fn postgres(pool: &sqlx::PgPool, hasher: PasswordHasher, config: SessionConfig) -> Result<Self> {
        Ok(Self {
            credentials: Arc::new(Credentials::new(
                Arc::new(PgUserStore::new(pool.clone())),
                hasher,
            )),
            sessions: Arc::new(Sessions::new(
                Arc::new(PgSessionStore::new(pool.clone())),
                config,
            )),
            notes: Arc::new(Notes::new(Arc::new(PgNoteStore::new(pool.clone())))),
            renderer: Arc::new(Renderer::new()?),
        })
    }

    /// Wire in-process stores. State is lost when the process exits.
    ///
    /// # Errors
    /// Returns an error if the renderer cannot be built.
    pub fn in_memory(hasher: PasswordHasher, config: SessionConfig) -> Result<Self> {
        Self::with_session_store(hasher, config, Arc::new(MemorySessionStore::new()))
    }

    /// In-process user and note stores with a caller-provided session store.
    ///
    /// # Errors
    /// Returns an error if the renderer cannot be built.
    pub fn with_session_store(
        hasher: PasswordHasher,
        config: SessionConfig,
        session_store: Arc<MemorySessionStore>,
    ) -> Result<Self> {
        Ok(Self {
            credentials: Arc::new(Credentials::new(Arc::new(MemoryUserStore::new()), hasher)),
            sessions: Arc::new(Sessions::new(session_store, config)),
            notes: Arc::new(Notes::new(Arc::new(MemoryNoteStore::new()))),
            renderer: Arc::new(Renderer::new()?),
        })
    }
}

/// Build the application router.
///
/// Session resolution wraps every route. The login wall is a `route_layer`
/// on the protected group, so it runs after resolution and only for routes
/// that matched.
pub fn router(services: &Services) -> Router {
    let protected = Router::new()
        .route("/members-only", get(members::members_only))
        .route("/note", get(notes::list))
        .route("/note/create", get(notes::create_form).post(notes::create))
        .route("/search", get(search::search_page).post(search::search))
        .route_layer(middleware::from_fn(require_login));

    // `/note/:id` is public: direct links skip the owner check.
    let public = Router::new()
        .route("/", get(root::home))
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi::openapi_json))
        .route("/new", get(user_register::register_form).post(user_register::register))
        .route("/login", get(user_login::login_form).post(user_login::login))
        .route("/logout", get(logout::logout))
        .route("/unauthorized", get(root::unauthorized))
        .route("/note/:id", get(notes::show));

    protected.merge(public).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(SetResponseHeaderLayer::if_not_present(
                X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            ))
            .layer(Extension(services.credentials.clone()))
            .layer(Extension(services.sessions.clone()))
            .layer(Extension(services.notes.clone()))
            .layer(Extension(services.renderer.clone()))
            .layer(middleware::from_fn(resolve_session)),
    )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    hasher: PasswordHasher,
    session_config: SessionConfig,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    schema::ensure_schema(&pool)
        .await
        .context("Failed to apply database schema")?;

    let services = Services::postgres(&pool, hasher, session_config)?;

    // Expired rows are also rejected on read; the reaper only reclaims space.
    let reaper = spawn_session_reaper(services.sessions.clone());

    let app = router(&services);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    reaper.abort();
    pool.close().await;

    Ok(())
}
