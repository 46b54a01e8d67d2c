//! Application-level configuration loading: disabled sports, default team colors and the clock ticker.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{dto::validation::is_hex_color, state::game::Side};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MULTISPORT_SCORE_CONFIG_PATH";
/// Color given to side A when the request and the config leave it out.
const DEFAULT_COLOR_A: &str = "#EF4444";
/// Color given to side B when the request and the config leave it out.
const DEFAULT_COLOR_B: &str = "#3B82F6";
const DEFAULT_CLOCK_TICK_MILLIS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    disabled_sports: Vec<String>,
    color_a: String,
    color_b: String,
    clock_tick: Option<Duration>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration stored at `path`, falling back to built-in defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        disabled = app_config.disabled_sports.len(),
                        "loaded application config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Sport identifiers the registry must refuse.
    pub fn disabled_sports(&self) -> &[String] {
        &self.disabled_sports
    }

    /// Color used for `side` when the creation request leaves it out.
    pub fn default_color(&self, side: Side) -> &str {
        match side {
            Side::A => &self.color_a,
            Side::B => &self.color_b,
        }
    }

    /// Interval between clock ticks of running games; `None` disables the ticker.
    pub fn clock_tick(&self) -> Option<Duration> {
        self.clock_tick
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            disabled_sports: Vec::new(),
            color_a: DEFAULT_COLOR_A.to_owned(),
            color_b: DEFAULT_COLOR_B.to_owned(),
            clock_tick: Some(Duration::from_millis(DEFAULT_CLOCK_TICK_MILLIS)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    disabled_sports: Vec<String>,
    #[serde(default)]
    team_colors: Option<RawTeamColors>,
    #[serde(default)]
    clock_tick_millis: Option<u64>,
}

#[derive(Debug, Deserialize)]
/// Default colors per side, as `#RRGGBB`.
struct RawTeamColors {
    a: Option<String>,
    b: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let (a, b) = value
            .team_colors
            .map(|colors| (colors.a, colors.b))
            .unwrap_or_default();

        Self {
            disabled_sports: value.disabled_sports,
            color_a: pick_color(a, defaults.color_a, Side::A),
            color_b: pick_color(b, defaults.color_b, Side::B),
            clock_tick: match value.clock_tick_millis {
                Some(0) => None,
                Some(millis) => Some(Duration::from_millis(millis)),
                None => defaults.clock_tick,
            },
        }
    }
}

fn pick_color(configured: Option<String>, fallback: String, side: Side) -> String {
    match configured {
        Some(color) if is_hex_color(&color) => color,
        Some(color) => {
            warn!(%side, color = %color, "ignoring invalid team color in config");
            fallback
        }
        None => fallback,
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!(
            "multisport-config-{}-{name}.json",
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = env::temp_dir().join("multisport-config-does-not-exist.json");
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = write_config("malformed", "{ not json");
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn file_values_override_defaults() {
        let path = write_config(
            "valid",
            r##"{"disabledSports": ["kabaddi"], "teamColors": {"a": "#112233"}, "clockTickMillis": 250}"##,
        );
        let config = AppConfig::load_from(&path);
        let _ = fs::remove_file(path);

        assert_eq!(config.disabled_sports(), ["kabaddi".to_string()]);
        assert_eq!(config.default_color(Side::A), "#112233");
        assert_eq!(config.default_color(Side::B), DEFAULT_COLOR_B);
        assert_eq!(config.clock_tick(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn invalid_color_and_zero_tick_are_handled() {
        let path = write_config(
            "edge",
            r##"{"teamColors": {"a": "red", "b": "#abcdef"}, "clockTickMillis": 0}"##,
        );
        let config = AppConfig::load_from(&path);
        let _ = fs::remove_file(path);

        assert_eq!(config.default_color(Side::A), DEFAULT_COLOR_A);
        assert_eq!(config.default_color(Side::B), "#abcdef");
        assert_eq!(config.clock_tick(), None);
    }
}
