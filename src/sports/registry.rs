//! Immutable table of sport plugins, built once at startup.

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::info;

use crate::sports::{SportConfig, SportMeta, badminton, basketball, kabaddi};

/// Failures resolving or registering a sport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No plugin is registered under the id.
    #[error("unknown sport `{0}`")]
    UnknownSport(String),
    /// The plugin exists but is disabled.
    #[error("sport `{0}` is disabled")]
    SportDisabled(String),
    /// The plugin failed load-time checks.
    #[error("invalid configuration for sport `{sport}`: {}", problems.join("; "))]
    InvalidConfiguration {
        /// Offending sport.
        sport: String,
        /// Every problem found.
        problems: Vec<String>,
    },
}

/// Lookup table from sport id to plugin.
#[derive(Debug, Clone)]
pub struct SportRegistry {
    sports: IndexMap<String, Arc<SportConfig>>,
}

impl SportRegistry {
    /// Validate and freeze a set of plugins, in registration order.
    pub fn new(configs: impl IntoIterator<Item = SportConfig>) -> Result<Self, RegistryError> {
        let mut sports = IndexMap::new();
        for config in configs {
            let problems = config.schema_problems();
            if !problems.is_empty() {
                return Err(RegistryError::InvalidConfiguration {
                    sport: config.meta.id.clone(),
                    problems,
                });
            }
            let id = config.meta.id.clone();
            if sports.insert(id.clone(), Arc::new(config)).is_some() {
                return Err(RegistryError::InvalidConfiguration {
                    sport: id,
                    problems: vec!["sport id is registered twice".to_owned()],
                });
            }
        }

        Ok(Self { sports })
    }

    /// Built-in sports, with the listed ids disabled.
    pub fn builtin(disabled: &[String]) -> Result<Self, RegistryError> {
        let configs = [basketball::config(), badminton::config(), kabaddi::config()]
            .into_iter()
            .map(|mut config| {
                if disabled.contains(&config.meta.id) {
                    info!(sport = %config.meta.id, "sport disabled by configuration");
                    config.meta.enabled = false;
                }
                config
            });
        Self::new(configs)
    }

    /// Resolve an enabled sport. Never substitutes another sport.
    pub fn get(&self, sport_id: &str) -> Result<Arc<SportConfig>, RegistryError> {
        let config = self
            .sports
            .get(sport_id)
            .ok_or_else(|| RegistryError::UnknownSport(sport_id.to_owned()))?;
        if !config.meta.enabled {
            return Err(RegistryError::SportDisabled(sport_id.to_owned()));
        }
        Ok(Arc::clone(config))
    }

    /// Metadata of every enabled sport, in registration order.
    pub fn list_enabled(&self) -> Vec<&SportMeta> {
        self.sports
            .values()
            .filter(|config| config.meta.enabled)
            .map(|config| &config.meta)
            .collect()
    }

    /// Every enabled plugin, in registration order.
    pub fn enabled_configs(&self) -> impl Iterator<Item = &Arc<SportConfig>> {
        self.sports.values().filter(|config| config.meta.enabled)
    }

    /// Whether a plugin is registered under the id, enabled or not.
    pub fn is_supported(&self, sport_id: &str) -> bool {
        self.sports.contains_key(sport_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_builtin_sports_in_order() {
        let registry = SportRegistry::builtin(&[]).unwrap();
        let ids: Vec<_> = registry
            .list_enabled()
            .into_iter()
            .map(|meta| meta.id.as_str())
            .collect();
        assert_eq!(ids, vec!["basketball", "badminton", "kabaddi"]);
        assert_eq!(registry.get("badminton").unwrap().meta.name, "Badminton");
    }

    #[test]
    fn unknown_sport_fails_closed() {
        let registry = SportRegistry::builtin(&[]).unwrap();
        assert_eq!(
            registry.get("curling").unwrap_err(),
            RegistryError::UnknownSport("curling".into())
        );
        assert!(!registry.is_supported("curling"));
    }

    #[test]
    fn disabled_sports_are_hidden_but_known() {
        let registry = SportRegistry::builtin(&["kabaddi".to_owned()]).unwrap();
        assert_eq!(
            registry.get("kabaddi").unwrap_err(),
            RegistryError::SportDisabled("kabaddi".into())
        );
        assert!(registry.is_supported("kabaddi"));
        assert!(
            registry
                .list_enabled()
                .iter()
                .all(|meta| meta.id != "kabaddi")
        );
    }

    #[test]
    fn invalid_configurations_are_rejected() {
        let mut broken = basketball::config();
        broken.rules.period_config.count = 0;

        let err = SportRegistry::new([broken]).unwrap_err();
        match err {
            RegistryError::InvalidConfiguration { sport, problems } => {
                assert_eq!(sport, "basketball");
                assert!(problems.iter().any(|p| p.contains("period count")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = SportRegistry::new([basketball::config(), basketball::config()]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidConfiguration { .. }));
    }
}
