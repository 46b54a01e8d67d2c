use serde::Serialize;
use utoipa::ToSchema;

use crate::sports::{ActionCatalog, SportConfig, SportRules};

/// Sport offered on the game creation screen, with its rules and action catalogs.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SportSummary {
    /// Identifier used when creating a game.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Icon name for the client.
    pub icon: String,
    /// One-line description.
    pub description: String,
    /// Accent color, `#RRGGBB`.
    pub color: String,
    /// Labels of the regulation periods, e.g. `Q1`..`Q4`.
    pub periods: Vec<String>,
    /// Rules a new game starts with.
    #[schema(value_type = Object)]
    pub rules: SportRules,
    /// Scoring actions, violations and events.
    #[schema(value_type = Object)]
    pub actions: ActionCatalog,
}

impl From<&SportConfig> for SportSummary {
    fn from(config: &SportConfig) -> Self {
        let periods = (1..=config.rules.period_config.count)
            .map(|n| config.period_label(n))
            .collect();

        Self {
            id: config.meta.id.clone(),
            name: config.meta.name.clone(),
            icon: config.meta.icon.clone(),
            description: config.meta.description.clone(),
            color: config.meta.color.clone(),
            periods,
            rules: config.rules.clone(),
            actions: config.actions.clone(),
        }
    }
}
