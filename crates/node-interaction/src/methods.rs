use std::{fmt::Display, str::FromStr};

use crate::{ArgumentFormatter, ResultFormatter};

/// How the arguments and the result of a method are formatted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub arguments: &'static [ArgumentFormatter],
    pub result: ResultFormatter,
}

macro_rules! define_anvil_methods {
    (
        $(
            $(#[$meta: meta])*
            $variant: ident => $name: literal : [$($argument: ident),* $(,)?] -> $result: ident
        ),* $(,)?
    ) => {
        /// The JSON-RPC methods that anvil reserves for manipulating the state of the node.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum AnvilMethod {
            $(
                $(#[$meta])*
                $variant,
            )*
        }

        impl AnvilMethod {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// The name of the method on the wire.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            pub const fn descriptor(&self) -> MethodDescriptor {
                match self {
                    $(
                        Self::$variant => MethodDescriptor {
                            arguments: &[$(ArgumentFormatter::$argument,)*],
                            result: ResultFormatter::$result,
                        },
                    )*
                }
            }
        }

        impl FromStr for AnvilMethod {
            type Err = UnknownMethod;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)*
                    _ => Err(UnknownMethod(s.to_owned())),
                }
            }
        }
    };
}

define_anvil_methods! {
    ImpersonateAccount => "anvil_impersonateAccount": [Address] -> ExpectNull,
    StopImpersonatingAccount => "anvil_stopImpersonatingAccount": [Address] -> ExpectNull,
    AutoImpersonateAccount => "anvil_autoImpersonateAccount": [Bool] -> ExpectNull,
    GetAutomine => "anvil_getAutomine": [] -> Bool,
    SetAutomine => "evm_setAutomine": [Bool] -> ExpectNull,
    /// Mines a number of blocks, optionally spaced by an interval in seconds.
    Mine => "anvil_mine": [Quantity, Quantity] -> ExpectNull,
    SetIntervalMining => "evm_setIntervalMining": [Quantity] -> ExpectNull,
    /// Removes a transaction from the pool, returning its hash if it was found.
    DropTransaction => "anvil_dropTransaction": [Bytes] -> OptionalBytes,
    Reset => "anvil_reset": [Forking] -> ExpectNull,
    SetRpcUrl => "anvil_setRpcUrl": [Text] -> ExpectNull,
    SetChainId => "anvil_setChainId": [Quantity] -> ExpectNull,
    SetBalance => "anvil_setBalance": [Address, Quantity] -> ExpectNull,
    SetCode => "anvil_setCode": [Address, Bytes] -> ExpectNull,
    SetNonce => "anvil_setNonce": [Address, Quantity] -> ExpectNull,
    SetStorageAt => "anvil_setStorageAt": [Address, Quantity, Bytes] -> Bool,
    SetCoinbase => "anvil_setCoinbase": [Address] -> ExpectNull,
    SetLoggingEnabled => "anvil_setLoggingEnabled": [Bool] -> ExpectNull,
    SetMinGasPrice => "anvil_setMinGasPrice": [Quantity] -> ExpectNull,
    SetNextBlockBaseFeePerGas => "anvil_setNextBlockBaseFeePerGas": [Quantity] -> ExpectNull,
    DumpState => "anvil_dumpState": [] -> Bytes,
    LoadState => "anvil_loadState": [Bytes] -> Bool,
    NodeInfo => "anvil_nodeInfo": [] -> Raw,
    Snapshot => "evm_snapshot": [] -> Quantity,
    Revert => "evm_revert": [Quantity] -> Bool,
    IncreaseTime => "evm_increaseTime": [Quantity] -> Raw,
    SetNextBlockTimestamp => "evm_setNextBlockTimestamp": [Quantity] -> ExpectNull,
    SetBlockTimestampInterval => "anvil_setBlockTimestampInterval": [Quantity] -> ExpectNull,
    SetBlockGasLimit => "evm_setBlockGasLimit": [Quantity] -> Bool,
    RemoveBlockTimestampInterval => "anvil_removeBlockTimestampInterval": [] -> Bool,
    EvmMine => "evm_mine": [Passthrough] -> ExpectNull,
    EnableTraces => "anvil_enableTraces": [] -> ExpectNull,
    SendUnsignedTransaction => "eth_sendUnsignedTransaction": [Passthrough] -> Bytes,
    TxpoolStatus => "txpool_status": [] -> Raw,
    TxpoolInspect => "txpool_inspect": [] -> Raw,
    TxpoolContent => "txpool_content": [] -> Raw,
}

impl Display for AnvilMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not an anvil method")]
pub struct UnknownMethod(pub String);
