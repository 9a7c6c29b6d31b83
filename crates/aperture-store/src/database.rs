use std::time::{Duration, Instant};

use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Execute, PgPool, Postgres, Transaction};
use tracing::{info, warn};

use crate::config::{AppEnv, DbConfig};
use crate::error::StoreError;

/// Queries slower than this are logged outside production.
const SLOW_QUERY_THRESHOLD: Duration = Duration::from_millis(100);

/// Acquisition and idle timeouts for the health probe's throwaway pool,
/// kept short so probes never hang on a wedged store.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on concurrently open dedicated (transactional) connections.
const DIRECT_POOL_SIZE: u32 = 4;

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// PostgreSQL connection provider.
///
/// Owns the shared pool used for plain queries and a small direct pool
/// (built from the non-pooling connection string) whose connections are
/// checked out exclusively for the lifetime of one transaction.
///
/// Constructed once at process start and injected into consumers. There is
/// no global pool and no in-process fail-fast hook; supervision of broken
/// connections belongs to the process orchestrator.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    direct: PgPool,
    env: AppEnv,
}

impl Database {
    /// Build the provider from configuration. Connections are established
    /// lazily, so this succeeds even while the store is unreachable.
    pub fn connect(config: &DbConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().connect_lazy_with(config.connect_options()?);
        let direct = PgPoolOptions::new()
            .max_connections(DIRECT_POOL_SIZE)
            .connect_lazy_with(config.direct_connect_options()?);

        info!(ssl = ?config.ssl, env = %config.env, "database provider initialized");

        Ok(Self {
            pool,
            direct,
            env: config.env,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run a parameterized query against the shared pool and collect every
    /// row.
    pub async fn fetch_all(&self, query: PgQuery<'_>) -> Result<Vec<PgRow>, StoreError> {
        let sql = query.sql().to_owned();
        let start = Instant::now();
        let rows = query.fetch_all(&self.pool).await?;
        self.observe(&sql, start.elapsed(), rows.len() as u64);
        Ok(rows)
    }

    /// Run a parameterized query expected to match at most one row.
    pub async fn fetch_optional(&self, query: PgQuery<'_>) -> Result<Option<PgRow>, StoreError> {
        let sql = query.sql().to_owned();
        let start = Instant::now();
        let row = query.fetch_optional(&self.pool).await?;
        self.observe(&sql, start.elapsed(), u64::from(row.is_some()));
        Ok(row)
    }

    /// Run a statement against the shared pool, returning rows affected.
    pub async fn execute(&self, query: PgQuery<'_>) -> Result<u64, StoreError> {
        let sql = query.sql().to_owned();
        let start = Instant::now();
        let result = query.execute(&self.pool).await?;
        self.observe(&sql, start.elapsed(), result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Open a transaction on a dedicated connection.
    ///
    /// The returned guard holds its connection exclusively: statements run
    /// strictly in order on one session. Commit is explicit; every other
    /// exit path (error, early return, drop) rolls back and returns the
    /// connection to the direct pool exactly once.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        Ok(self.direct.begin().await?)
    }

    /// Liveness probe: a short-lived single-connection pool, one trivial
    /// query, then teardown. Returns round-trip latency.
    pub async fn ping(config: &DbConfig) -> Result<Duration, StoreError> {
        let start = Instant::now();
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(HEALTH_TIMEOUT)
            .idle_timeout(HEALTH_TIMEOUT)
            .connect_lazy_with(config.connect_options()?);

        let result = sqlx::query("SELECT 1").execute(&pool).await;
        let latency = start.elapsed();
        pool.close().await;

        result?;
        Ok(latency)
    }

    fn observe(&self, sql: &str, elapsed: Duration, rows: u64) {
        if slow_query(self.env, elapsed) {
            warn!(
                sql,
                duration_ms = elapsed.as_millis() as u64,
                rows,
                "slow query"
            );
        }
    }
}

/// Whether a query duration warrants a slow-query warning.
fn slow_query(env: AppEnv, elapsed: Duration) -> bool {
    !env.is_production() && elapsed > SLOW_QUERY_THRESHOLD
}
