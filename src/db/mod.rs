//! Database client handle, backend selection, and the process-wide provider.
//!
//! A [`Db`] wraps exactly one sqlx pool. Which pool depends on the
//! [`BackendKind`] of the connection string. All pools are created lazily:
//! nothing touches the network until the first query.

pub mod backend;
pub mod provider;

use std::str::FromStr;
use std::time::Duration;

use opentelemetry::KeyValue;
use sqlx::any::AnyPoolOptions;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{AnyPool, PgPool, SqlitePool};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::telemetry::metrics;
use backend::BackendKind;

pub use provider::ClientProvider;

const PG_MAX_CONNECTIONS: u32 = 10;
const PG_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const PG_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// Schemes served by the drivers compiled into sqlx's Any driver.
const GENERIC_SCHEMES: &[&str] = &["postgres", "postgresql", "mysql", "mariadb", "sqlite"];

/// The underlying sqlx pool.
#[derive(Debug, Clone)]
enum DbPool {
    Sqlite(SqlitePool),
    Postgres(PgPool),
    /// Generic driver; `scheme` picks the dialect for metadata queries.
    Any { pool: AnyPool, scheme: String },
}

/// Database handle. Owns the connection pool shared by every caller.
#[derive(Debug)]
pub struct Db {
    kind: BackendKind,
    pool: DbPool,
}

impl Db {
    /// Build a lazily-connected client for a normalized connection string.
    ///
    /// Postgres strings that the Postgres driver can't be configured for
    /// fall back to the generic driver with the raw string.
    pub fn connect_lazy(url: &str) -> Result<Self> {
        let kind = backend::classify(url);
        let built = match kind {
            BackendKind::File => Self::sqlite(url).map(|db| (db, "ok")),
            BackendKind::Postgres | BackendKind::ManagedPostgres => {
                match Self::postgres(url, kind) {
                    Ok(db) => Ok((db, "ok")),
                    Err(e) => {
                        warn!(backend = %kind, error = %e, "postgres client setup failed, falling back to generic driver");
                        Self::generic(url, kind).map(|db| (db, "fallback"))
                    }
                }
            }
            BackendKind::Generic => Self::generic(url, kind).map(|db| (db, "ok")),
        };

        match built {
            Ok((db, outcome)) => {
                record_initialization(kind, outcome);
                info!(backend = %kind, driver = db.driver(), "database client initialized");
                Ok(db)
            }
            Err(e) => {
                record_initialization(kind, "error");
                Err(e)
            }
        }
    }

    fn sqlite(url: &str) -> Result<Self> {
        let path = backend::sqlite_path(url);
        let pool = if path.is_empty() || path == ":memory:" {
            let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|source| {
                Error::BackendInit {
                    backend: BackendKind::File,
                    source,
                }
            })?;
            // Each in-memory connection is its own database: keep exactly one alive.
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_lazy_with(options)
        } else {
            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);
            SqlitePoolOptions::new()
                .max_connections(SQLITE_MAX_CONNECTIONS)
                .connect_lazy_with(options)
        };

        Ok(Self {
            kind: BackendKind::File,
            pool: DbPool::Sqlite(pool),
        })
    }

    fn postgres(url: &str, kind: BackendKind) -> Result<Self> {
        let init_err = |source: sqlx::Error| Error::BackendInit {
            backend: kind,
            source,
        };

        let mut pool_options = PgPoolOptions::new()
            .max_connections(PG_MAX_CONNECTIONS)
            .idle_timeout(PG_IDLE_TIMEOUT)
            .acquire_timeout(PG_ACQUIRE_TIMEOUT);

        let options = if kind == BackendKind::ManagedPostgres {
            let managed = backend::prepare_managed(url)
                .map_err(|e| init_err(sqlx::Error::Configuration(e.into())))?;
            if let Some(max) = managed.max_connections {
                pool_options = pool_options.max_connections(max);
            }
            if let Some(timeout) = managed.acquire_timeout {
                pool_options = pool_options.acquire_timeout(timeout);
            }
            let options = PgConnectOptions::from_str(&managed.url).map_err(init_err)?;
            if managed.transaction_pooler {
                options.statement_cache_capacity(0)
            } else {
                options
            }
        } else {
            PgConnectOptions::from_str(url).map_err(init_err)?
        };

        Ok(Self {
            kind,
            pool: DbPool::Postgres(pool_options.connect_lazy_with(options)),
        })
    }

    fn generic(url: &str, kind: BackendKind) -> Result<Self> {
        let scheme = url
            .split(':')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        // The Any driver only resolves the scheme on first connect.
        if !GENERIC_SCHEMES.contains(&scheme.as_str()) {
            return Err(Error::BackendInit {
                backend: kind,
                source: sqlx::Error::Configuration(
                    format!("no driver available for URL scheme {scheme:?}").into(),
                ),
            });
        }

        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .connect_lazy(url)
            .map_err(|source| Error::BackendInit {
                backend: kind,
                source,
            })?;

        Ok(Self {
            kind,
            pool: DbPool::Any { pool, scheme },
        })
    }

    /// Backend the connection string was classified as.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Name of the driver actually serving this client.
    ///
    /// Differs from [`Self::kind`] after a fallback to the generic driver.
    pub fn driver(&self) -> &'static str {
        match self.pool {
            DbPool::Sqlite(_) => "sqlite",
            DbPool::Postgres(_) => "postgres",
            DbPool::Any { .. } => "any",
        }
    }

    pub fn as_sqlite(&self) -> Option<&SqlitePool> {
        match &self.pool {
            DbPool::Sqlite(pool) => Some(pool),
            _ => None,
        }
    }

    pub fn as_postgres(&self) -> Option<&PgPool> {
        match &self.pool {
            DbPool::Postgres(pool) => Some(pool),
            _ => None,
        }
    }

    pub fn as_any(&self) -> Option<&AnyPool> {
        match &self.pool {
            DbPool::Any { pool, .. } => Some(pool),
            _ => None,
        }
    }

    /// Minimal round trip: `SELECT 1`.
    pub async fn ping(&self) -> Result<()> {
        match &self.pool {
            DbPool::Sqlite(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DbPool::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
            DbPool::Any { pool, .. } => {
                sqlx::query("SELECT 1").execute(pool).await?;
            }
        }
        Ok(())
    }

    /// Whether a table with this name exists in the current schema.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let count: i64 = match &self.pool {
            DbPool::Sqlite(pool) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                )
                .bind(table)
                .fetch_one(pool)
                .await?
            }
            DbPool::Postgres(pool) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM information_schema.tables
                     WHERE table_schema = current_schema() AND table_name::text = $1",
                )
                .bind(table)
                .fetch_one(pool)
                .await?
            }
            DbPool::Any { pool, scheme } => {
                let sql = match scheme.as_str() {
                    "postgres" | "postgresql" => {
                        "SELECT COUNT(*) FROM information_schema.tables
                         WHERE table_schema = current_schema() AND table_name::text = $1"
                    }
                    "mysql" | "mariadb" => {
                        "SELECT COUNT(*) FROM information_schema.tables
                         WHERE table_schema = DATABASE() AND table_name = ?"
                    }
                    "sqlite" => {
                        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?"
                    }
                    other => {
                        return Err(Error::Other(format!(
                            "table lookup not supported for scheme {other}"
                        )));
                    }
                };
                sqlx::query_scalar(sql).bind(table).fetch_one(pool).await?
            }
        };
        Ok(count > 0)
    }
}

fn record_initialization(kind: BackendKind, result: &'static str) {
    metrics::client_initializations().add(
        1,
        &[
            KeyValue::new("backend", kind.as_str()),
            KeyValue::new("result", result),
        ],
    );
}
