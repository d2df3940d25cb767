//! Talking to a running anvil node: JSON-RPC transports and the typed anvil methods.

mod api;
mod error;
mod formatters;
mod jsonrpc;
mod methods;
mod provider_transport;
mod transport;
mod types;

pub use api::*;
pub use error::*;
pub use formatters::*;
pub use jsonrpc::*;
pub use methods::*;
pub use provider_transport::*;
pub use transport::*;
pub use types::*;
