//! Backend classification and connection-string handling.
//!
//! Every connection string goes through [`classify`] exactly once, and the
//! resulting [`BackendKind`] decides which pool gets built. Managed Postgres
//! providers need their URLs rewritten before sqlx sees them; see
//! [`prepare_managed`].

use std::fmt;
use std::time::Duration;

use url::Url;

/// Host suffixes of managed Postgres providers that sit behind a pooler.
const MANAGED_HOST_SUFFIXES: &[&str] = &[".neon.tech", ".supabase.co", ".supabase.com"];

/// Port used by transaction-mode poolers on managed hosts.
const TRANSACTION_POOLER_PORT: u16 = 6543;

/// Query parameters meaningful to poolers but unknown to the Postgres driver.
const POOLER_PARAMS: &[&str] = &["pgbouncer", "connection_limit", "pool_timeout"];

/// Which driver a connection string is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Local SQLite database file (`file:` or `sqlite:` prefix).
    File,
    /// Self-hosted Postgres.
    Postgres,
    /// Postgres on a managed provider, usually behind PgBouncer.
    ManagedPostgres,
    /// Anything else, handed to the generic driver unchanged.
    Generic,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "sqlite",
            Self::Postgres => "postgres",
            Self::ManagedPostgres => "managed-postgres",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim whitespace and one layer of matching surrounding quotes.
///
/// Returns `None` when nothing is left, which callers treat as "not set".
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|&q| {
            trimmed
                .strip_prefix(q)
                .and_then(|rest| rest.strip_suffix(q))
        })
        .unwrap_or(trimmed)
        .trim();

    (!unquoted.is_empty()).then(|| unquoted.to_string())
}

/// Classify a normalized connection string.
pub fn classify(url: &str) -> BackendKind {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("file:") || lower.starts_with("sqlite:") {
        BackendKind::File
    } else if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
        if is_managed(url) {
            BackendKind::ManagedPostgres
        } else {
            BackendKind::Postgres
        }
    } else {
        BackendKind::Generic
    }
}

fn is_managed(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let managed_host = parsed.host_str().is_some_and(|host| {
        let host = host.to_ascii_lowercase();
        MANAGED_HOST_SUFFIXES
            .iter()
            .any(|suffix| host.ends_with(suffix))
    });
    managed_host || has_pgbouncer_flag(&parsed)
}

fn has_pgbouncer_flag(url: &Url) -> bool {
    url.query_pairs()
        .any(|(k, v)| k == "pgbouncer" && v.eq_ignore_ascii_case("true"))
}

/// Filesystem path of a `file:`/`sqlite:` connection string.
///
/// Query parameters are dropped. `:memory:` (or an empty path) means an
/// in-memory database.
pub fn sqlite_path(url: &str) -> &str {
    let rest = ["file:", "sqlite:"]
        .iter()
        .find_map(|prefix| {
            url.get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| &url[prefix.len()..])
        })
        .unwrap_or(url);
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    rest.split('?').next().unwrap_or_default()
}

/// A managed Postgres URL rewritten for the driver, plus the pool settings
/// the provider encoded in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPostgres {
    /// URL with pooler-only parameters removed and `sslmode` defaulted.
    pub url: String,
    /// From `connection_limit`.
    pub max_connections: Option<u32>,
    /// From `pool_timeout` (seconds).
    pub acquire_timeout: Option<Duration>,
    /// Transaction poolers can't keep prepared statements across queries.
    pub transaction_pooler: bool,
}

/// Rewrite a managed Postgres connection string.
pub fn prepare_managed(raw: &str) -> Result<ManagedPostgres, url::ParseError> {
    let mut url = Url::parse(raw)?;

    let transaction_pooler = has_pgbouncer_flag(&url)
        || url.port() == Some(TRANSACTION_POOLER_PORT)
        || url
            .host_str()
            .is_some_and(|host| host.to_ascii_lowercase().contains("pooler."));

    let mut max_connections = None;
    let mut acquire_timeout = None;
    let mut kept = Vec::new();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "connection_limit" => {
                max_connections = value.parse::<u32>().ok().filter(|n| *n > 0);
            }
            "pool_timeout" => {
                acquire_timeout = value.parse::<u64>().ok().map(Duration::from_secs);
            }
            k if POOLER_PARAMS.contains(&k) => {}
            _ => kept.push((key.into_owned(), value.into_owned())),
        }
    }
    if !kept.iter().any(|(k, _)| k == "sslmode") {
        kept.push(("sslmode".to_string(), "require".to_string()));
    }

    url.query_pairs_mut().clear().extend_pairs(kept);

    Ok(ManagedPostgres {
        url: url.into(),
        max_connections,
        acquire_timeout,
        transaction_pooler,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_whitespace_and_quotes() {
        assert_eq!(
            normalize("  \"postgres://a@b/c\"\n").as_deref(),
            Some("postgres://a@b/c")
        );
        assert_eq!(normalize("'file:./dev.db'").as_deref(), Some("file:./dev.db"));
        assert_eq!(normalize("\"unbalanced").as_deref(), Some("\"unbalanced"));
    }

    #[test]
    fn normalize_rejects_blank() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
        assert_eq!(normalize("\"\""), None);
        assert_eq!(normalize("' '"), None);
    }

    #[test]
    fn sqlite_path_handles_prefixes() {
        assert_eq!(sqlite_path("file:./dev.db"), "./dev.db");
        assert_eq!(sqlite_path("FILE:/var/data/app.db"), "/var/data/app.db");
        assert_eq!(sqlite_path("sqlite://data.db?mode=rwc"), "data.db");
        assert_eq!(sqlite_path("sqlite::memory:"), ":memory:");
    }

    #[test]
    fn pooler_port_marks_transaction_pooler() {
        let managed =
            prepare_managed("postgresql://u:p@aws-0-eu.supabase.com:6543/postgres").unwrap();
        assert!(managed.transaction_pooler);

        let direct = prepare_managed("postgresql://u:p@db.abc.supabase.co:5432/postgres").unwrap();
        assert!(!direct.transaction_pooler);
    }
}
