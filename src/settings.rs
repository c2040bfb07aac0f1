use std::path::PathBuf;

use crate::errors::ConfigError;
use crate::gate::Configuration;

pub const ENABLED_KEY: &str = "RONFLEX_ENABLED";
pub const EXCLUDED_PATHS_KEY: &str = "RONFLEX_EXCLUDED_PATHS";
pub const MAINTENANCE_PAGE_KEY: &str = "RONFLEX_MAINTENANCE_PAGE";

/// Gate settings taken from the environment. Unset keys leave the
/// configuration as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateSettingsEnv {
    pub enabled: Option<bool>,
    pub excluded_paths: Option<Vec<String>>,
    pub maintenance_page: Option<PathBuf>,
}

impl GateSettingsEnv {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let enabled = lookup(ENABLED_KEY)
            .map(|value| parse_bool(ENABLED_KEY, &value))
            .transpose()?;
        let excluded_paths = lookup(EXCLUDED_PATHS_KEY).map(|value| parse_paths(&value));
        let maintenance_page = lookup(MAINTENANCE_PAGE_KEY)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            enabled,
            excluded_paths,
            maintenance_page,
        })
    }

    pub fn apply_to<I: 'static>(&self, config: &Configuration<I>) {
        if let Some(enabled) = self.enabled {
            config.set_enabled(enabled);
        }
        if let Some(paths) = &self.excluded_paths {
            config.set_excluded_paths(paths.iter().cloned());
        }
        if let Some(page) = &self.maintenance_page {
            config.set_maintenance_page(page.clone());
        }
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_paths(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .collect()
}
