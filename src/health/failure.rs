//! Classification of probe failures into actionable categories.

use std::io;

use crate::error::Error;

/// What went wrong, as far as an operator is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    BackendInit,
    Timeout,
    Unreachable,
    ConnectionClosed,
    AuthenticationFailed,
    /// SQLite could not open the database file.
    FileUnavailable,
    Unknown,
}

impl FailureKind {
    /// Stable code reported in the `code` field.
    pub fn code(self) -> &'static str {
        match self {
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::BackendInit => "BACKEND_INIT_ERROR",
            Self::Timeout => "CONNECTION_TIMEOUT",
            Self::Unreachable => "SERVER_UNREACHABLE",
            Self::ConnectionClosed => "CONNECTION_CLOSED",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::FileUnavailable => "DATABASE_FILE_UNAVAILABLE",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    pub fn suggestion(self) -> Option<&'static str> {
        match self {
            Self::Configuration => Some(
                "Set DATABASE_URL to a file:, postgres:// or other supported connection string.",
            ),
            Self::BackendInit => Some(
                "Check that DATABASE_URL is a well-formed connection string for a supported database.",
            ),
            Self::Timeout | Self::Unreachable => Some(
                "Check that the database server is running and reachable from this host, \
                 and that DATABASE_URL points at the right host and port.",
            ),
            Self::ConnectionClosed => Some(
                "The database closed the connection. Check the server's connection limits; \
                 behind a connection pooler, add pgbouncer=true to DATABASE_URL.",
            ),
            Self::AuthenticationFailed => {
                Some("Check the username and password in DATABASE_URL.")
            }
            Self::FileUnavailable => Some(
                "Check that the directory in the file: path of DATABASE_URL exists \
                 and that this process can read and write it.",
            ),
            Self::Unknown => None,
        }
    }

    /// Map a backend-reported error code (SQLSTATE, MySQL or SQLite code).
    ///
    /// SQLite reports `SQLITE_CANTOPEN` (14) and its extended variants
    /// `_ISDIR`, `_FULLPATH` and `_SYMLINK` as decimal strings.
    pub fn from_backend_code(code: &str) -> Option<Self> {
        match code {
            "08001" | "08004" | "08006" => Some(Self::Unreachable),
            "14" | "526" | "782" | "1550" => Some(Self::FileUnavailable),
            "08003" | "57P01" | "57P02" | "57P03" => Some(Self::ConnectionClosed),
            "28000" | "28P01" | "1045" => Some(Self::AuthenticationFailed),
            _ => None,
        }
    }

    pub fn from_io_kind(kind: io::ErrorKind) -> Option<Self> {
        use io::ErrorKind::*;
        match kind {
            ConnectionRefused | NotFound | HostUnreachable | NetworkUnreachable | TimedOut
            | AddrNotAvailable => Some(Self::Unreachable),
            ConnectionReset | ConnectionAborted | BrokenPipe | UnexpectedEof => {
                Some(Self::ConnectionClosed)
            }
            _ => None,
        }
    }
}

/// A classified probe failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub kind: FailureKind,
    /// Code reported by the driver or OS, when there is one.
    pub backend_code: Option<String>,
}

impl ProbeFailure {
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::Configuration(_) => Self::bare(FailureKind::Configuration),
            Error::BackendInit { source, .. } => {
                let mut failure = Self::from_sqlx(source);
                if failure.kind == FailureKind::Unknown {
                    failure.kind = FailureKind::BackendInit;
                }
                failure
            }
            Error::Database(e) => Self::from_sqlx(e),
            Error::Timeout(_) => Self::bare(FailureKind::Timeout),
            Error::Other(_) => Self::bare(FailureKind::Unknown),
        }
    }

    fn bare(kind: FailureKind) -> Self {
        Self {
            kind,
            backend_code: None,
        }
    }

    fn from_sqlx(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io) => {
                let kind = FailureKind::from_io_kind(io.kind()).unwrap_or(FailureKind::Unknown);
                Self {
                    kind,
                    backend_code: Some(format!("{:?}", io.kind())),
                }
            }
            sqlx::Error::Database(db) => {
                let code = db.code().map(|c| c.into_owned());
                let kind = code
                    .as_deref()
                    .and_then(FailureKind::from_backend_code)
                    .unwrap_or(FailureKind::Unknown);
                Self {
                    kind,
                    backend_code: code,
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_) => Self::bare(FailureKind::Unreachable),
            sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                Self::bare(FailureKind::ConnectionClosed)
            }
            sqlx::Error::Configuration(_) => Self::bare(FailureKind::Configuration),
            _ => Self::bare(FailureKind::Unknown),
        }
    }
}
