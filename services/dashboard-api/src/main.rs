use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    serve, Router,
};
use clearcoa_database::{initialize_database, ObjectStorage, ObjectStorageConfig, PostgresPool};
use clearcoa_utils::{init_logging, AppConfig, StorageBackend, StorageConfig};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

mod handlers;
mod metrics;
mod middleware;
mod routes;
mod session;
mod views;

use metrics::Metrics;
use middleware::*;
use session::SessionStore;
use views::InsightsRegistry;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(600);
const MAX_VIEW_IDLE_MINUTES: u64 = 24 * 60 * 365;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({}), using defaults", e);
        AppConfig::default()
    });

    // Initialize logging
    init_logging(&config.logging)?;
    info!("Starting Clear-COA dashboard API");

    // Initialize database
    let db_config = clearcoa_database::DatabaseConfig {
        postgres_url: config.database.postgres_url.clone(),
        max_connections: config.database.max_connections,
        connection_timeout: Duration::from_secs(config.database.connection_timeout_seconds),
        run_migrations: config.database.run_migrations,
    };
    let pool = initialize_database(&db_config).await?;
    info!("Database connection established");

    let storage = ObjectStorage::from_config(object_storage_config(&config.storage)?)
        .context("Failed to initialize object storage")?;
    if let Err(e) = storage.health_check().await {
        warn!(error = %e, bucket = storage.bucket(), "Object storage not reachable yet");
    }

    let state = AppState::new(pool, storage, config.clone())?;
    spawn_session_purge(state.clone());

    // Build application router
    let app = create_app(state);

    // Start server
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Dashboard API listening on {}", addr);

    serve(listener, app).await?;

    Ok(())
}

fn object_storage_config(config: &StorageConfig) -> Result<ObjectStorageConfig> {
    match config.backend {
        StorageBackend::Local => Ok(ObjectStorageConfig::Local {
            root: config.local_root.clone().into(),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }),
        StorageBackend::Supabase => Ok(ObjectStorageConfig::Supabase {
            base_url: config
                .supabase_url
                .clone()
                .context("storage.supabase_url is required for the supabase backend")?,
            service_role_key: config
                .service_role_key
                .clone()
                .context("storage.service_role_key is required for the supabase backend")?,
            bucket: config.bucket.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }),
    }
}

fn spawn_session_purge(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let (sessions, views) = purge_stale_state(&state).await;
            if sessions > 0 || views > 0 {
                info!(sessions, views, "Purged expired sessions and idle views");
            }
        }
    });
}

/// Drop expired sessions together with their views, then views left idle.
async fn purge_stale_state(state: &AppState) -> (usize, usize) {
    let expired = state.sessions.purge_expired().await;
    let mut views = 0;
    for session_id in &expired {
        views += state.views.unmount_session(*session_id).await;
    }

    let idle_minutes = state.config.auth.view_idle_minutes.clamp(1, MAX_VIEW_IDLE_MINUTES) as i64;
    views += state.views.evict_idle(chrono::Duration::minutes(idle_minutes)).await;
    (expired.len(), views)
}

fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let mut app = Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))

        // API routes
        .nest("/api/v1", routes::create_api_routes(state.clone()));

    // Local uploads are served straight from disk
    if config.storage.backend == StorageBackend::Local {
        app = app.nest_service("/files", ServeDir::new(&config.storage.local_root));
    }

    app
        // Middleware stack
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                        .expose_headers([header::CONTENT_DISPOSITION]),
                )
                .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout_seconds)))
                .layer(DefaultBodyLimit::max(config.server.max_request_size))
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(axum::middleware::from_fn(error_handling_middleware)),
        )

        // Application state
        .with_state(state)
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PostgresPool,
    pub storage: ObjectStorage,
    pub sessions: SessionStore,
    pub views: InsightsRegistry,
    pub metrics: Metrics,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(pool: PostgresPool, storage: ObjectStorage, config: AppConfig) -> Result<Self> {
        let metrics = Metrics::new(&config.monitoring.prometheus_namespace)
            .context("Failed to register metrics")?;

        Ok(Self {
            pool,
            storage,
            sessions: SessionStore::new(config.auth.session_ttl_hours),
            views: InsightsRegistry::new(),
            metrics,
            config: Arc::new(config),
        })
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "clearcoa-dashboard-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    if !state.config.monitoring.metrics_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    state.metrics.render().into_response()
}
