//! Application configuration
//!
//! Loaded from `.unistate.toml` in the current directory, then from the user
//! config directory (`~/.config/unistate-counter/config.toml` on Linux).

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use unistate::StoreConfig;

const APP_NAME: &str = "unistate-counter";
const CONFIG_FILE: &str = ".unistate.toml";

/// Application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Wrap the reducer with action/state tracing into the log file
    #[serde(default = "default_trace")]
    pub trace: bool,

    /// Cascade settings of the store
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_trace() -> bool {
    cfg!(debug_assertions)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            trace: default_trace(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from CWD first, then the config directory, or use defaults
    pub fn load() -> Self {
        if let Some(content) = load_config_file() {
            match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded app config from file");
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file: {}", e);
                }
            }
        }

        log::debug!("Using default app config");
        Self::default()
    }
}

fn load_config_file() -> Option<String> {
    if let Ok(content) = std::fs::read_to_string(CONFIG_FILE) {
        log::debug!("Loaded config from {}", CONFIG_FILE);
        return Some(content);
    }

    let global = dirs::config_dir()?.join(APP_NAME).join("config.toml");
    match std::fs::read_to_string(&global) {
        Ok(content) => {
            log::debug!("Loaded config from {}", global.display());
            Some(content)
        }
        Err(_) => None,
    }
}

/// Get the application cache directory, creating it if needed
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use unistate::CascadeOrder;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.trace, cfg!(debug_assertions));
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            trace = false

            [store]
            max_cascade_depth = 64
            cascade_order = "breadth-first"
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert!(!config.trace);
        assert_eq!(config.store.max_cascade_depth, Some(64));
        assert_eq!(config.store.cascade_order, CascadeOrder::BreadthFirst);
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml = r#"
            [store]
            max_cascade_depth = 8
        "#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        // trace should use default
        assert_eq!(config.trace, cfg!(debug_assertions));
        assert_eq!(config.store.max_cascade_depth, Some(8));
        assert_eq!(config.store.cascade_order, CascadeOrder::DepthFirst);
    }
}
