//! Starting, probing and tearing down local anvil nodes.

mod anvil;
mod error;
mod liveliness;
mod process;
mod shutdown;

pub use anvil::*;
pub use error::*;
pub use liveliness::*;
pub use process::*;
pub use shutdown::*;

/// An abstract interface for supervised nodes.
pub trait Node {
    /// Spawns the node.
    ///
    /// Blocking until it's ready to accept requests.
    fn spawn(&mut self) -> anyhow::Result<()>;

    /// Terminates the node.
    ///
    /// Blocking until it's completely stopped.
    fn shutdown(&mut self) -> anyhow::Result<()>;

    /// Returns the node version.
    fn version(&self) -> anyhow::Result<String>;
}
