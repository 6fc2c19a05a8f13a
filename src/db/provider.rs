//! Process-wide, lazily-initialized database client.
//!
//! The first successful [`ClientProvider::client`] call builds a [`Db`] and
//! caches it; every later call returns the same `Arc`. Initialization is not
//! serialized: callers racing on a cold provider may each build a candidate,
//! the first one stored wins and the rest are dropped. Pools are lazy, so a
//! dropped candidate never opened a connection.

use std::sync::{Arc, OnceLock};

use tracing::error;

use super::Db;
use super::backend;
use crate::config::secrets::{ExposeSecret, SecretString};
use crate::error::{Error, Result};

/// Env var holding the connection string.
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Error message when the connection string is missing or blank.
pub const MISSING_DATABASE_URL: &str = "DATABASE_URL environment variable is not set";

enum UrlSource {
    /// Read `DATABASE_URL` each time a client is needed.
    Env,
    Fixed(Option<SecretString>),
}

/// Hands out the shared [`Db`], building it on first use.
pub struct ClientProvider {
    source: UrlSource,
    cached: OnceLock<Arc<Db>>,
}

impl ClientProvider {
    /// Provider reading `DATABASE_URL` from the process environment.
    pub fn from_env() -> Self {
        Self {
            source: UrlSource::Env,
            cached: OnceLock::new(),
        }
    }

    /// Provider with an explicit connection string.
    pub fn with_url(url: Option<SecretString>) -> Self {
        Self {
            source: UrlSource::Fixed(url),
            cached: OnceLock::new(),
        }
    }

    /// The provider shared by the whole process.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ClientProvider>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::from_env())))
    }

    /// Whether a non-blank connection string is available.
    pub fn has_database_url(&self) -> bool {
        self.connection_string().is_some()
    }

    /// The cached client, if one has been built.
    pub fn cached(&self) -> Option<Arc<Db>> {
        self.cached.get().cloned()
    }

    /// Get the shared client, building it on first use.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] when the connection string is missing or
    /// blank, [`Error::BackendInit`] when no pool could be built for it.
    /// Nothing is cached on failure.
    pub fn client(&self) -> Result<Arc<Db>> {
        if let Some(db) = self.cached.get() {
            return Ok(Arc::clone(db));
        }

        let url = self
            .connection_string()
            .ok_or_else(|| Error::Configuration(MISSING_DATABASE_URL.to_string()))
            .inspect_err(|e| error!(error = %e, "database client initialization failed"))?;

        let db = Db::connect_lazy(url.expose_secret())
            .inspect_err(|e| error!(error = %e, "database client initialization failed"))?;

        Ok(Arc::clone(self.cached.get_or_init(|| Arc::new(db))))
    }

    fn connection_string(&self) -> Option<SecretString> {
        let raw = match &self.source {
            UrlSource::Env => std::env::var(DATABASE_URL_VAR).ok()?,
            UrlSource::Fixed(url) => url.as_ref()?.expose_secret().to_string(),
        };
        backend::normalize(&raw).map(SecretString::from)
    }
}

impl Default for ClientProvider {
    fn default() -> Self {
        Self::from_env()
    }
}
