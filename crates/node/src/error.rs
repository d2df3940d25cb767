use std::{io, path::PathBuf, time::Duration};

use anvil_dt_config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(ConfigError),

    /// The node process couldn't be started or exited before it answered RPC requests.
    #[error("failed to launch the node from `{}`", binary.display())]
    Launch {
        binary: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("the node at {url} didn't answer RPC requests within {timeout:?}")]
    StartupTimeout { url: String, timeout: Duration },

    #[error("failed to allocate a free port for the node")]
    PortAllocation(#[source] io::Error),
}

impl From<ConfigError> for NodeError {
    fn from(value: ConfigError) -> Self {
        match value {
            ConfigError::PortAllocation(error) => Self::PortAllocation(error),
            other => Self::Config(other),
        }
    }
}
