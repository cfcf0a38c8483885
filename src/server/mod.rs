//! HTTP API for the sandbox: query execution plus assignment and attempt
//! routes.
//!
//! The router owns the composition of the core: the pool is built by the
//! caller and injected, so tests can substitute their own. Both success and
//! failure execution envelopes are returned with status 200; HTTP error
//! statuses are reserved for malformed requests and unknown resources.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

use crate::attempts::{AttemptLog, AttemptRecord};
use crate::catalog::{Assignment, AssignmentCatalog, AssignmentSummary};
use crate::config::Config;
use crate::error::SandboxError;
use crate::executor::{ExecutionResult, SandboxExecutor};

/// Errors that can occur while bootstrapping or running the HTTP server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Assignment seed file failed to load.
    #[error("failed to load assignment catalog: {0}")]
    Catalog(#[from] SandboxError),
    /// The configured database URL did not parse into pool options.
    #[error("failed to configure sandbox pool: {0}")]
    Pool(#[from] sqlx::Error),
    /// Binding the TCP listener or serving failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

type AppState = Arc<ServerState>;

/// Attempts returned per request, newest first.
const MAX_ATTEMPTS_PER_RESPONSE: usize = 50;

struct ServerState {
    executor: SandboxExecutor,
    catalog: AssignmentCatalog,
    attempts: AttemptLog,
}

/// Builds the process-wide sandbox pool described by `config`.
///
/// Connections are established lazily on first acquisition, so the server
/// can come up before the database does. The pool is owned by the
/// composition root and injected into the executor, never reached for
/// globally.
pub fn build_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.pool_max_connections)
        .acquire_timeout(Duration::from_millis(config.pool_acquire_timeout_ms))
        .idle_timeout(Duration::from_millis(config.pool_idle_timeout_ms))
        .connect_lazy(&config.database_url)
}

/// Assembles the application router over an injected pool.
pub fn build_app(config: &Config, pool: PgPool) -> Result<Router, ServeError> {
    let catalog = match &config.assignments_path {
        Some(path) => {
            let catalog = AssignmentCatalog::load(path)?;
            tracing::info!(
                count = catalog.len(),
                path = %path.display(),
                "assignment catalog loaded"
            );
            catalog
        }
        None => AssignmentCatalog::empty(),
    };

    let executor = SandboxExecutor::new(pool)
        .with_statement_timeout(Duration::from_millis(config.statement_timeout_ms));

    let state = Arc::new(ServerState {
        executor,
        catalog,
        attempts: AttemptLog::new(config.attempt_log_capacity),
    });

    Ok(build_router(state, &config.allow_origins))
}

/// Starts the HTTP server and runs until a shutdown signal arrives.
pub async fn serve(config: Config) -> Result<(), ServeError> {
    install_tracing_subscriber();

    let pool = build_pool(&config)?;
    let app = build_app(&config, pool)?;
    let addr = SocketAddr::from((config.host, config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "sandbox api listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_router(state: AppState, allow_origins: &[String]) -> Router {
    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/api/query/execute", post(execute_handler))
        .route("/api/assignments", get(list_assignments_handler))
        .route("/api/assignments/:id", get(get_assignment_handler))
        .route("/api/attempts", get(list_attempts_handler));

    if let Some(layer) = build_cors_layer(allow_origins) {
        router = router.layer(layer);
    }

    router.with_state(state).layer(TraceLayer::new_for_http())
}

fn build_cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let mut allowed = Vec::new();
    for origin in origins {
        let normalized = normalize_origin(origin);
        match normalized
            .as_deref()
            .and_then(|value| HeaderValue::from_str(value).ok())
        {
            Some(value) => allowed.push(value),
            None => {
                tracing::warn!(%origin, ?normalized, "ignoring invalid CORS origin");
            }
        }
    }

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([ACCEPT, CONTENT_TYPE]),
    )
}

fn normalize_origin(origin: &str) -> Option<String> {
    let trimmed = origin.trim();
    if trimmed.is_empty() {
        return None;
    }
    let without_trailing_slash = trimmed.trim_end_matches('/');
    if without_trailing_slash.is_empty() {
        return None;
    }
    Some(without_trailing_slash.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest {
    query: String,
    #[serde(default)]
    assignment_id: Option<String>,
}

async fn execute_handler(
    State(state): State<AppState>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<ExecutionResult>, AppError> {
    if payload.query.trim().is_empty() {
        return Err(AppError::BadRequest("SQL query is required"));
    }

    let result = state.executor.execute(&payload.query).await;

    // Attempt bookkeeping must never block or fail the execution response.
    if let Some(assignment_id) = payload.assignment_id {
        state.attempts.record(AttemptRecord {
            assignment_id: Some(assignment_id),
            sql_query: payload.query,
            is_successful: result.is_success(),
            execution_time: result.execution_time(),
            error_message: result.error().map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        });
    }

    Ok(Json(result))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn health_handler() -> Json<HealthResponse> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(HealthResponse {
        status: "ok",
        timestamp,
    })
}

#[derive(Debug, Serialize)]
struct AssignmentListResponse {
    success: bool,
    count: usize,
    assignments: Vec<AssignmentSummary>,
}

async fn list_assignments_handler(State(state): State<AppState>) -> Json<AssignmentListResponse> {
    let assignments = state.catalog.summaries();
    Json(AssignmentListResponse {
        success: true,
        count: assignments.len(),
        assignments,
    })
}

#[derive(Debug, Serialize)]
struct AssignmentResponse {
    success: bool,
    assignment: Assignment,
}

async fn get_assignment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let assignment = state
        .catalog
        .get(&id)
        .cloned()
        .ok_or(AppError::NotFound("assignment"))?;
    Ok(Json(AssignmentResponse {
        success: true,
        assignment,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttemptsParams {
    #[serde(default)]
    assignment_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct AttemptListResponse {
    success: bool,
    count: usize,
    attempts: Vec<AttemptRecord>,
}

async fn list_attempts_handler(
    State(state): State<AppState>,
    Query(params): Query<AttemptsParams>,
) -> Json<AttemptListResponse> {
    let attempts = state
        .attempts
        .recent(params.assignment_id.as_deref(), MAX_ATTEMPTS_PER_RESPONSE);
    Json(AttemptListResponse {
        success: true,
        count: attempts.len(),
        attempts,
    })
}

#[derive(Debug, Error)]
enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(&'static str),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };
        let body = Json(ErrorPayload {
            success: false,
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct ErrorPayload {
    success: bool,
    error: String,
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(?err, "failed to listen for shutdown signal"),
    }
}

fn install_tracing_subscriber() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
