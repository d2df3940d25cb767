//! The configuration of the anvil node and of the process that supervises it.

mod anvil;
mod command_line;
mod error;
mod option_value;
mod supervisor;

pub use anvil::*;
pub use command_line::*;
pub use error::*;
pub use option_value::*;
pub use supervisor::*;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// The command line arguments of the `anvil-dt` binary.
#[derive(Clone, Debug, Default, Parser, Serialize, Deserialize)]
#[command(name = "anvil-dt", about = "Starts and supervises a local anvil node")]
pub struct Arguments {
    #[command(flatten)]
    #[serde(default)]
    pub supervisor: SupervisorConfiguration,

    #[command(flatten)]
    #[serde(default)]
    pub anvil: AnvilConfiguration,
}

impl AsRef<SupervisorConfiguration> for Arguments {
    fn as_ref(&self) -> &SupervisorConfiguration {
        &self.supervisor
    }
}

impl AsRef<AnvilConfiguration> for Arguments {
    fn as_ref(&self) -> &AnvilConfiguration {
        &self.anvil
    }
}
