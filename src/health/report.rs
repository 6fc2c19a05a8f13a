//! Health status record rendered by the HTTP endpoint.

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use super::failure::ProbeFailure;
use crate::error::Error;

/// Existence of an expected table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableState {
    Exists,
    Missing,
    /// The metadata query itself failed.
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthyBody {
    pub status: &'static str,
    pub database: &'static str,
    pub tables: BTreeMap<String, TableState>,
    pub environment: String,
    pub has_database_url: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnhealthyBody {
    pub status: &'static str,
    pub database: &'static str,
    pub error: String,
    pub code: &'static str,
    pub has_database_url: bool,
    pub timestamp: String,
    /// Wire name kept for existing monitoring dashboards.
    #[serde(rename = "prismaCode", skip_serializing_if = "Option::is_none")]
    pub backend_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum HealthBody {
    Healthy(HealthyBody),
    Unhealthy(UnhealthyBody),
}

/// Outcome of one probe.
#[derive(Debug, Clone)]
pub struct HealthReport {
    pub body: HealthBody,
}

impl HealthReport {
    pub fn healthy(
        tables: BTreeMap<String, TableState>,
        environment: &str,
        has_database_url: bool,
    ) -> Self {
        Self {
            body: HealthBody::Healthy(HealthyBody {
                status: "healthy",
                database: "connected",
                tables,
                environment: environment.to_string(),
                has_database_url,
                timestamp: timestamp(),
            }),
        }
    }

    pub fn unhealthy(err: &Error, failure: ProbeFailure, has_database_url: bool) -> Self {
        Self {
            body: HealthBody::Unhealthy(UnhealthyBody {
                status: "unhealthy",
                database: "disconnected",
                error: err.to_string(),
                code: failure.kind.code(),
                has_database_url,
                timestamp: timestamp(),
                backend_code: failure.backend_code,
                suggestion: failure.kind.suggestion(),
            }),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.body, HealthBody::Healthy(_))
    }

    /// HTTP status for this report: 200 or 503.
    pub fn status_code(&self) -> u16 {
        if self.is_healthy() { 200 } else { 503 }
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
