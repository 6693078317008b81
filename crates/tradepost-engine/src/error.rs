//! Error types for the engine binary.

/// Failures while preparing or running a trading session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Economy configuration failed to load.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: tradepost_economy::ConfigError,
    },

    /// The `session` section of the config file is unusable.
    #[error("session config error: {message}")]
    Session {
        /// Description of the problem.
        message: String,
    },

    /// The seeded catalog has no currency item.
    #[error("catalog has no '{name}' item")]
    MissingCurrency {
        /// The reserved currency name.
        name: &'static str,
    },
}
