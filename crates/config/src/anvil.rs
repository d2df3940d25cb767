//! The configuration schema of the anvil node.

use std::{net::Ipv4Addr, path::PathBuf};

use anvil_dt_common::net::allocate_free_port;
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{CommandLine, ConfigError, OptionValue, PruneHistory, ToOptionValue};

/// Declares the [`AnvilConfiguration`] struct from a single list of options.
///
/// Every entry names the field, its type, the CLI flag of the node and optionally a default
/// provider that's called when the field is left unset. The declaration order is the order in
/// which the options are passed to the node.
macro_rules! define_anvil_configuration {
    (@defaulted $flag: literal, $default: path) => {
        $flag
    };
    (
        $(
            $(#[$meta: meta])*
            $field: ident: $ty: ty => $flag: literal $(, default = $default: path)?;
        )*
    ) => {
        /// The startup options of the anvil node. Unset options are not passed to the node at all
        /// and are left to the node's own defaults.
        #[derive(Clone, Debug, Default, PartialEq, Eq, Args, Serialize, Deserialize)]
        #[serde(default)]
        pub struct AnvilConfiguration {
            $(
                $(#[$meta])*
                #[arg(long = $flag)]
                pub $field: $ty,
            )*
        }

        impl AnvilConfiguration {
            /// The CLI flags of all of the options in declaration order.
            pub const FLAGS: &'static [&'static str] = &[$($flag),*];

            /// The options that have a default provider.
            pub const DEFAULTED_OPTIONS: &'static [&'static str] = &[
                $($(define_anvil_configuration!(@defaulted $flag, $default),)?)*
            ];

            /// Returns every option of the schema and its command line value, `None` for the
            /// options that are unset.
            pub fn options(&self) -> Vec<(&'static str, Option<OptionValue>)> {
                vec![$(($flag, ToOptionValue::to_option_value(&self.$field)),)*]
            }

            fn apply_defaults(&mut self) -> Result<(), ConfigError> {
                $($(
                    if self.$field.is_none() {
                        self.$field = Some($default()?);
                    }
                )?)*
                Ok(())
            }
        }
    };
}

define_anvil_configuration! {
    /// Number of dev accounts to generate and configure.
    accounts: Option<u64> => "accounts";
    /// Block time in seconds for interval mining.
    block_time: Option<u64> => "block-time";
    /// The balance of every dev account in Ether.
    balance: Option<u64> => "balance";
    /// Writes output of `anvil` as json to user-specified file.
    config_out: Option<PathBuf> => "config-out";
    /// Sets the derivation path of the child key to be derived.
    derivation_path: Option<String> => "derivation-path";
    /// Dump the state and block environment of chain on exit to the given file.
    dump_state: Option<PathBuf> => "dump-state";
    /// The EVM hardfork to use.
    hardfork: Option<String> => "hardfork";
    /// Initialize the genesis block with the given `genesis.json` file.
    init: Option<PathBuf> => "init";
    /// Launch an ipc server at the given path.
    ipc: Option<PathBuf> => "ipc";
    /// Initialize the chain from a previously saved state snapshot.
    load_state: Option<PathBuf> => "load-state";
    /// BIP39 mnemonic phrase used for generating accounts.
    mnemonic: Option<String> => "mnemonic";
    /// Disable auto and interval mining, and mine on demand instead.
    no_mining: bool => "no-mining";
    /// How transactions are sorted in the mempool.
    order: Option<String> => "order";
    /// Don't keep full chain history, or keep the given number of states in memory.
    #[arg(num_args = 0..=1, default_missing_value = "true")]
    prune_history: Option<PruneHistory> => "prune-history";
    /// Interval in seconds at which the state and block environment is to be dumped to disk.
    state_interval: Option<u64> => "state-interval";
    /// Don't print anything on startup and don't print logs.
    silent: bool => "silent";
    /// Shorthand for loading the state from and dumping it to the same file.
    state: Option<PathBuf> => "state";
    /// The timestamp of the genesis block.
    timestamp: Option<u64> => "timestamp";
    /// Number of blocks with transactions to keep in memory.
    transaction_block_keeper: Option<u64> => "transaction-block-keeper";

    /// The CORS `allow_origin` header.
    allow_origin: Option<String> => "allow-origin";
    /// Disable CORS.
    no_cors: bool => "no-cors";

    /// Number of assumed available compute units per second for the fork provider.
    compute_units_per_second: Option<u64> => "compute-units-per-second";
    /// Fetch state over a remote endpoint instead of starting from an empty state.
    fork_url: Option<String> => "fork-url";
    /// Fetch state from a specific block number over the fork endpoint.
    fork_block_number: Option<u64> => "fork-block-number";
    /// Specify the chain id to skip fetching it from the fork endpoint.
    fork_chain_id: Option<u64> => "fork-chain-id";
    /// Initial retry backoff in milliseconds on encountering errors on the fork endpoint.
    fork_retry_backoff: Option<u64> => "fork-retry-backoff";
    /// Disable rate limiting for the fork provider.
    no_rate_limit: bool => "no-rate-limit";
    /// Explicitly disable the use of the RPC caching.
    no_storage_caching: bool => "no-storage-caching";
    /// Number of retry requests for spurious networks.
    retries: Option<u32> => "retries";
    /// Timeout in milliseconds for requests sent to the fork endpoint.
    timeout: Option<u64> => "timeout";

    /// The base fee in a block.
    block_base_fee_per_gas: Option<u128> => "block-base-fee-per-gas";
    /// The chain ID.
    chain_id: Option<u64> => "chain-id";
    /// EIP-170 contract code size limit in bytes.
    code_size_limit: Option<u64> => "code-size-limit";
    /// Disable the `call.gas_limit <= block.gas_limit` constraint.
    disable_block_gas_limit: bool => "disable-block-gas-limit";
    /// The block gas limit.
    gas_limit: Option<u128> => "gas-limit";
    /// The gas price.
    gas_price: Option<u128> => "gas-price";

    /// Enable autoImpersonate on startup.
    auto_impersonate: bool => "auto-impersonate";
    /// Enable steps tracing used for debug calls returning geth-style traces.
    steps_tracing: bool => "steps-tracing";

    /// The host the server will listen on.
    host: Option<String> => "host", default = default_host;
    /// Port number to listen on. A free port is picked when not set.
    port: Option<u16> => "port", default = default_port;
}

impl AnvilConfiguration {
    /// Fails on combinations of options that the node would refuse to start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.no_mining && self.block_time.is_some() {
            return Err(ConfigError::Conflict {
                option: "no-mining",
                conflicts_with: "block-time",
            });
        }
        if self.disable_block_gas_limit && self.gas_limit.is_some() {
            return Err(ConfigError::Conflict {
                option: "disable-block-gas-limit",
                conflicts_with: "gas-limit",
            });
        }
        if self.fork_url.is_none() {
            let fork_only_options = [
                ("fork-block-number", self.fork_block_number.is_some()),
                ("fork-chain-id", self.fork_chain_id.is_some()),
                ("fork-retry-backoff", self.fork_retry_backoff.is_some()),
            ];
            if let Some((option, _)) = fork_only_options.into_iter().find(|(_, set)| *set) {
                return Err(ConfigError::MissingRequirement {
                    option,
                    requires: "fork-url",
                });
            }
        }
        if self.port == Some(0) {
            return Err(ConfigError::Invalid {
                option: "port",
                reason: "the node needs a concrete port to be reachable".into(),
            });
        }
        Ok(())
    }

    /// Validates the configuration and fills in the options that have a default provider.
    pub fn resolve(&self) -> Result<ResolvedAnvilConfiguration, ConfigError> {
        self.validate()?;

        let mut configuration = self.clone();
        configuration.apply_defaults()?;

        let host = configuration
            .host
            .clone()
            .ok_or(ConfigError::Unresolved { option: "host" })?;
        let port = configuration
            .port
            .ok_or(ConfigError::Unresolved { option: "port" })?;

        Ok(ResolvedAnvilConfiguration {
            configuration,
            host,
            port,
        })
    }

    /// Derives the command line of the options that are currently set.
    pub fn command_line(&self) -> CommandLine {
        CommandLine::from_options(self.options())
    }
}

fn default_host() -> Result<String, ConfigError> {
    Ok(Ipv4Addr::LOCALHOST.to_string())
}

fn default_port() -> Result<u16, ConfigError> {
    allocate_free_port().map_err(ConfigError::PortAllocation)
}

/// An [`AnvilConfiguration`] whose host and port are known. Immutable once resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAnvilConfiguration {
    configuration: AnvilConfiguration,
    host: String,
    port: u16,
}

impl ResolvedAnvilConfiguration {
    pub fn configuration(&self) -> &AnvilConfiguration {
        &self.configuration
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn command_line(&self) -> CommandLine {
        self.configuration.command_line()
    }

    /// `host:port`
    pub fn url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.url())
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.url())
    }
}
