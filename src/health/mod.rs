//! Database health probe.
//!
//! # Data Flow
//! ```text
//! HealthProbe::check
//!     → ClientProvider::client   (configuration errors become 503s)
//!     → SELECT 1 under a 10s bound
//!     → table existence lookups  (never flip overall status)
//!     → HealthReport
//! ```
//!
//! The probe never returns an error: every failure is classified into a
//! [`failure::FailureKind`] and rendered into the report.

pub mod failure;
pub mod report;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tracing::{Instrument, warn};

use crate::config::{Config, DEFAULT_HEALTH_TABLE};
use crate::db::ClientProvider;
use crate::error::{Error, Result};
use crate::telemetry::{metrics, probe};
pub use failure::{FailureKind, ProbeFailure};
pub use report::{HealthBody, HealthReport, TableState};

/// Bound on the liveness query.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HealthProbe {
    provider: Arc<ClientProvider>,
    tables: Vec<String>,
    environment: String,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(provider: Arc<ClientProvider>, environment: impl Into<String>) -> Self {
        Self {
            provider,
            tables: vec![DEFAULT_HEALTH_TABLE.to_string()],
            environment: environment.into(),
            timeout: LIVENESS_TIMEOUT,
        }
    }

    pub fn from_config(provider: Arc<ClientProvider>, config: &Config) -> Self {
        Self::new(provider, config.environment.clone()).with_tables(config.health_tables.clone())
    }

    /// Tables whose existence is reported.
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one probe.
    pub async fn check(&self) -> HealthReport {
        let span = probe::start_probe_span(&self.environment);
        let started = Instant::now();
        let has_database_url = self.provider.has_database_url();

        let report = match self.run().instrument(span.clone()).await {
            Ok(tables) => HealthReport::healthy(tables, &self.environment, has_database_url),
            Err(err) => {
                let failure = ProbeFailure::classify(&err);
                span.in_scope(|| {
                    warn!(error = %err, code = failure.kind.code(), "database health check failed");
                });
                HealthReport::unhealthy(&err, failure, has_database_url)
            }
        };

        let code = match &report.body {
            HealthBody::Healthy(_) => "OK",
            HealthBody::Unhealthy(body) => body.code,
        };
        let status = if report.is_healthy() { "healthy" } else { "unhealthy" };
        probe::record_probe_outcome(&span, status, code);

        metrics::health_probes().add(
            1,
            &[KeyValue::new("status", status), KeyValue::new("code", code)],
        );
        metrics::operation_duration_ms().record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", "health_probe")],
        );

        report
    }

    async fn run(&self) -> Result<BTreeMap<String, TableState>> {
        let db = self.provider.client()?;

        tokio::time::timeout(self.timeout, db.ping())
            .await
            .map_err(|_| Error::Timeout(self.timeout))??;

        let mut tables = BTreeMap::new();
        for table in &self.tables {
            let state = match tokio::time::timeout(self.timeout, db.table_exists(table)).await {
                Ok(Ok(true)) => TableState::Exists,
                Ok(Ok(false)) => TableState::Missing,
                Ok(Err(e)) => {
                    warn!(table = %table, error = %e, "table existence check failed");
                    TableState::Unknown
                }
                Err(_) => {
                    warn!(table = %table, "table existence check timed out");
                    TableState::Unknown
                }
            };
            tables.insert(table.clone(), state);
        }
        Ok(tables)
    }
}
