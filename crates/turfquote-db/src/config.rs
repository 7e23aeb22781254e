use std::env;

/// Database configuration.
///
/// Reads from the `TURFQUOTE_DATABASE_URL` environment variable, falling back
/// to `postgresql://localhost:5432/turfquote` when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/turfquote";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "TURFQUOTE_DATABASE_URL";

    /// Build a config from the environment.
    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self { database_url }
    }

    /// Build a config from an explicit URL (tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Extract the database name from the URL, ignoring any query string.
    ///
    /// Returns `None` if the URL has no path component.
    pub fn database_name(&self) -> Option<&str> {
        let without_query = self
            .database_url
            .split_once('?')
            .map_or(self.database_url.as_str(), |(base, _)| base);
        let (_, name) = without_query.rsplit_once('/')?;
        if name.is_empty() || name.contains(':') || name.contains('@') {
            None
        } else {
            Some(name)
        }
    }

    /// URL of the `postgres` maintenance database on the same host, used to
    /// issue `CREATE DATABASE` when the target does not exist yet.
    pub fn maintenance_url(&self) -> String {
        let (base, query) = match self.database_url.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (self.database_url.as_str(), None),
        };
        let Some((prefix, _)) = base.rsplit_once('/') else {
            return self.database_url.clone();
        };
        let mut url = format!("{prefix}/postgres");
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
