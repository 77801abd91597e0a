//! Store configuration
//!
//! Tunes how a [`Store`](crate::Store) drains the cascade of follow-up
//! actions produced by one `send`. Usually embedded as a `[store]` table in
//! an application's TOML config file.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Order in which follow-up actions are processed within one cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CascadeOrder {
    /// An action's follow-ups are fully drained before its next sibling runs.
    #[default]
    DepthFirst,
    /// Follow-ups are queued behind every action already pending.
    BreadthFirst,
}

/// Configuration for a [`Store`](crate::Store)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Deepest allowed follow-up nesting. The top-level action sits at depth 0,
    /// its follow-ups at depth 1 and so on.
    ///
    /// `None` (the default) leaves the cascade unbounded.
    #[serde(default)]
    pub max_cascade_depth: Option<usize>,

    /// Processing order of follow-up actions
    #[serde(default)]
    pub cascade_order: CascadeOrder,
}

impl StoreConfig {
    /// Parse a config from TOML text. Missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the maximum cascade depth
    pub fn with_max_cascade_depth(mut self, limit: usize) -> Self {
        self.max_cascade_depth = Some(limit);
        self
    }

    /// Set the cascade order
    pub fn with_cascade_order(mut self, order: CascadeOrder) -> Self {
        self.cascade_order = order;
        self
    }
}
