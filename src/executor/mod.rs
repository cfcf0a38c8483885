//! Bounded execution of admitted statements against the sandbox pool.
//!
//! The executor is the only component that touches the database. Every call
//! runs the admission filter first, leases one pooled connection for the
//! duration of the statement, applies a server-side statement timeout, and
//! folds success and every failure mode into a uniform [`ExecutionResult`].
//! Nothing is retried and no error escapes this module's boundary.

mod cells;

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::postgres::PgPool;
use sqlx::Executor as _;
use tracing::{debug, warn};

use crate::admission;

/// Default server-side statement execution ceiling.
pub const DEFAULT_STATEMENT_TIMEOUT_MS: u64 = 5_000;

/// One result row shaped as column-name → JSON value, in column order.
pub type RowObject = Map<String, Value>;

/// Ordered column descriptor taken from result metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Column name as reported by the database.
    pub name: String,
    /// Driver type identifier (the Postgres type name, e.g. `INT4`).
    pub data_type: String,
}

/// Payload of a statement that ran and had its rows fully materialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySuccess {
    /// Always `true`; kept explicit for the wire shape.
    pub success: bool,
    /// Result rows in database order, each in column order.
    pub rows: Vec<RowObject>,
    /// Number of rows returned.
    pub row_count: usize,
    /// Ordered column descriptors.
    pub fields: Vec<FieldDescriptor>,
    /// Wall-clock milliseconds from executor entry to result availability.
    pub execution_time: u64,
}

/// Payload of a rejected or failed statement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFailure {
    /// Always `false`.
    pub success: bool,
    /// Admission or driver message, surfaced to the caller verbatim.
    pub error: String,
    /// Wall-clock milliseconds from executor entry to the failure.
    pub execution_time: u64,
}

/// Uniform result envelope: exactly one variant per call, timing on both.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    /// The statement was admitted, executed, and materialized.
    Success(QuerySuccess),
    /// The statement was rejected or failed; never re-raised to the caller.
    Failure(QueryFailure),
}

impl ExecutionResult {
    /// Builds the success envelope.
    pub fn success(rows: Vec<RowObject>, fields: Vec<FieldDescriptor>, elapsed: Duration) -> Self {
        let row_count = rows.len();
        Self::Success(QuerySuccess {
            success: true,
            rows,
            row_count,
            fields,
            execution_time: elapsed.as_millis() as u64,
        })
    }

    /// Builds the failure envelope.
    pub fn failure(error: impl Into<String>, elapsed: Duration) -> Self {
        Self::Failure(QueryFailure {
            success: false,
            error: error.into(),
            execution_time: elapsed.as_millis() as u64,
        })
    }

    /// Whether this is the success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Execution time in milliseconds; populated on both variants.
    pub fn execution_time(&self) -> u64 {
        match self {
            Self::Success(success) => success.execution_time,
            Self::Failure(failure) => failure.execution_time,
        }
    }

    /// Failure message, when this is the failure variant.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(&failure.error),
        }
    }
}

/// Executes admitted statements with resource bounds.
///
/// Holds the injected process-wide pool; cheap to clone, one instance per
/// composition root. Concurrent executions share the pool but never a
/// connection: each call exclusively owns its lease until the statement
/// completes, and the lease is returned on every exit path by drop.
#[derive(Debug, Clone)]
pub struct SandboxExecutor {
    pool: PgPool,
    statement_timeout: Duration,
}

impl SandboxExecutor {
    /// Wraps an already-constructed pool with the default statement ceiling.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statement_timeout: Duration::from_millis(DEFAULT_STATEMENT_TIMEOUT_MS),
        }
    }

    /// Overrides the server-side statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Runs `raw` through the admission filter and, if accepted, against the
    /// sandbox database.
    ///
    /// Never returns an error: admission rejections, pool-acquisition
    /// timeouts, statement failures, and timeout aborts all come back as the
    /// failure envelope with elapsed wall-clock time. Rejected input never
    /// touches the pool.
    pub async fn execute(&self, raw: &str) -> ExecutionResult {
        let started = Instant::now();

        let sql = match admission::admit(raw) {
            Ok(sql) => sql,
            Err(rejected) => {
                debug!(%rejected, "statement refused by admission filter");
                return ExecutionResult::failure(rejected.to_string(), started.elapsed());
            }
        };

        match self.run(sql).await {
            Ok((rows, fields)) => {
                debug!(rows = rows.len(), "statement completed");
                ExecutionResult::success(rows, fields, started.elapsed())
            }
            Err(err) => {
                if matches!(err, sqlx::Error::PoolTimedOut) {
                    warn!("sandbox pool exhausted; connection acquisition timed out");
                }
                let message = error_message(&err);
                debug!(error = %message, "statement failed");
                ExecutionResult::failure(message, started.elapsed())
            }
        }
    }

    async fn run(
        &self,
        sql: &str,
    ) -> Result<(Vec<RowObject>, Vec<FieldDescriptor>), sqlx::Error> {
        // The lease is returned to the pool when `conn` drops, on every path.
        let mut conn = self.pool.acquire().await?;

        let timeout_ms = self.statement_timeout.as_millis();
        sqlx::query(&format!("SET statement_timeout = {timeout_ms}"))
            .execute(&mut *conn)
            .await?;

        // Executed verbatim as a single parameter-free command; the full row
        // set is materialized before returning.
        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;

        let fields = match rows.first() {
            Some(row) => cells::row_fields(row),
            // Empty result sets carry no per-row metadata; recover the
            // column list from a prepare round-trip.
            None => {
                let described = (&mut *conn).describe(sql).await?;
                cells::field_descriptors(described.columns())
            }
        };

        let shaped = rows.iter().map(cells::row_object).collect();
        Ok((shaped, fields))
    }
}

/// Prefers the server's own message text (e.g. "canceling statement due to
/// statement timeout") over sqlx's wrapper prose.
fn error_message(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db) => db.message().to_string(),
        other => other.to_string(),
    }
}
