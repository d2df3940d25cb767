use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Args};
use serde::{Deserialize, Serialize};

/// Configures how the anvil process is started, probed and torn down.
#[derive(Clone, Debug, PartialEq, Eq, Args, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfiguration {
    /// The path to the `anvil` executable.
    ///
    /// By default it uses the `anvil` binary found in `$PATH`.
    #[arg(long = "anvil", default_value = "anvil")]
    pub binary_path: PathBuf,

    /// Discard the stdout and stderr of the node.
    #[arg(long = "suppress-output", default_value_t = true, action = ArgAction::Set)]
    pub suppress_output: bool,

    /// Write the stdout and stderr of the node to log files in this directory. Takes precedence
    /// over `--suppress-output`.
    #[arg(long = "logs-directory")]
    pub logs_directory: Option<PathBuf>,

    /// The maximum time in seconds to wait for the node to answer RPC requests.
    #[arg(long = "liveliness-timeout", default_value_t = 60)]
    pub liveliness_timeout_secs: u64,

    /// The time in milliseconds to wait between two liveliness probes.
    #[arg(long = "liveliness-interval", default_value_t = 1)]
    pub liveliness_interval_ms: u64,

    /// Terminate the node when the supervising process shuts down.
    #[arg(long = "auto-exit", default_value_t = true, action = ArgAction::Set)]
    pub auto_exit: bool,
}

impl SupervisorConfiguration {
    pub fn liveliness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveliness_timeout_secs)
    }

    pub fn liveliness_interval(&self) -> Duration {
        Duration::from_millis(self.liveliness_interval_ms)
    }
}

impl Default for SupervisorConfiguration {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from("anvil"),
            suppress_output: true,
            logs_directory: None,
            liveliness_timeout_secs: 60,
            liveliness_interval_ms: 1,
            auto_exit: true,
        }
    }
}
