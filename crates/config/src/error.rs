use std::io;

/// Errors raised while validating or resolving an [`AnvilConfiguration`].
///
/// [`AnvilConfiguration`]: crate::AnvilConfiguration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("the `--{option}` option can't be used together with `--{conflicts_with}`")]
    Conflict {
        option: &'static str,
        conflicts_with: &'static str,
    },

    #[error("the `--{option}` option requires `--{requires}` to be set")]
    MissingRequirement {
        option: &'static str,
        requires: &'static str,
    },

    #[error("invalid value for `--{option}`: {reason}")]
    Invalid {
        option: &'static str,
        reason: String,
    },

    #[error("the `--{option}` option has no value after applying the defaults")]
    Unresolved { option: &'static str },

    #[error("failed to allocate a free port for the node")]
    PortAllocation(#[source] io::Error),
}
