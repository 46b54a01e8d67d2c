use std::time::Duration;

use super::error::{CouchDaoError, CouchResult};

/// Database used when `COUCH_DB` is not set.
const DEFAULT_DATABASE: &str = "multisport_games";
/// TCP connect timeout used when `COUCH_CONNECT_TIMEOUT_SECS` is not set.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the game database lives and how to log into it.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root, e.g. `http://localhost:5984`.
    pub base_url: String,
    /// Database holding one document per game.
    pub database: String,
    /// Basic-auth user and password.
    pub credentials: Option<(String, String)>,
    /// TCP connect timeout of the HTTP client.
    pub connect_timeout: Duration,
}

impl CouchConfig {
    /// Configuration for `database` on the server at `base_url`, without credentials.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            credentials: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Log in with basic auth.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB`, `COUCH_USERNAME`/`COUCH_PASSWORD`
    /// and `COUCH_CONNECT_TIMEOUT_SECS`.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let base_url = var("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;
        let database = var("COUCH_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_owned());

        let mut config = Self::new(base_url, database);
        if let (Some(username), Some(password)) = (var("COUCH_USERNAME"), var("COUCH_PASSWORD")) {
            config = config.with_credentials(username, password);
        }
        if let Some(secs) = var("COUCH_CONNECT_TIMEOUT_SECS").and_then(|raw| raw.parse().ok()) {
            config.connect_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config = CouchConfig::from_lookup(lookup(&[("COUCH_BASE_URL", "http://couch:5984")]))
            .unwrap();
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert!(config.credentials.is_none());
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn credentials_need_both_halves() {
        let config = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "http://couch:5984"),
            ("COUCH_USERNAME", "admin"),
            ("COUCH_CONNECT_TIMEOUT_SECS", "2"),
        ]))
        .unwrap();
        assert!(config.credentials.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn base_url_is_required() {
        let err = CouchConfig::from_lookup(lookup(&[("COUCH_DB", "games")])).unwrap_err();
        assert!(matches!(err, CouchDaoError::MissingEnvVar { var: "COUCH_BASE_URL" }));
    }
}
