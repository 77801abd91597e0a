//! Error types for store operations and configuration parsing.

/// Error returned by [`Store::try_send`](crate::Store::try_send).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A reducer kept emitting follow-up actions past the configured limit.
    ///
    /// The working copy of the state is discarded when this happens, so the
    /// canonical state and every channel stay exactly as they were before
    /// the `send`.
    #[error("cascade depth exceeded: follow-up chain nested deeper than {limit}")]
    CascadeDepthExceeded {
        /// The configured `max_cascade_depth`.
        limit: usize,
    },
}

/// Error returned when a [`StoreConfig`](crate::StoreConfig) cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid store config: {0}")]
    Parse(#[from] toml::de::Error),
}
