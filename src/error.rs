//! Error types for dbprobe.

use std::time::Duration;

use thiserror::Error;

use crate::db::backend::BackendKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Configuration(String),

    #[error("failed to initialize {backend} client: {source}")]
    BackendInit {
        backend: BackendKind,
        #[source]
        source: sqlx::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database did not respond within {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
