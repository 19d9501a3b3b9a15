//! Error types surfaced to the step orchestrator.

use thiserror::Error;

/// Failure of a single step invocation.
///
/// The step performs no recovery of its own. Every variant is fatal to the
/// invocation that produced it and no proceed signal is sent for it.
#[derive(Debug, Error, PartialEq)]
pub enum StepError {
    /// No shared-state entry is stored under the key.
    #[error("no shared state registered under key `{key}`")]
    MissingState { key: String },

    /// A shared-state entry exists but holds a different type.
    #[error("shared state `{key}` is not a {expected}")]
    StateType { key: String, expected: &'static str },

    /// The context has no data provider of the requested type.
    #[error("data provider {provider} is not registered")]
    MissingProvider { provider: &'static str },

    /// The avatar provider produced no image for the author.
    #[error("no avatar image available for @{handle}")]
    MissingAvatar { handle: String },

    /// The step was started outside a tokio runtime, so its transitions
    /// have nothing to run on.
    #[error("no async runtime available to play transitions")]
    NoRuntime,

    /// The step definition carried configuration that does not validate.
    #[error("invalid step configuration: {0}")]
    InvalidConfig(String),
}

/// Failure to load the TOML configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
