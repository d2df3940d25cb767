use alloy::primitives::{B256, Bytes, hex};
use serde::{Deserialize, Serialize};

/// Byte arguments accepted by the anvil methods, either raw bytes or an already hex encoded
/// `0x` string.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValidBytes {
    Raw(Bytes),
    Hex(String),
}

impl ValidBytes {
    /// Returns the `0x` prefixed hex representation. Hex strings are checked but not re-encoded.
    pub fn to_hex(&self) -> Result<String, String> {
        match self {
            Self::Raw(bytes) => Ok(hex::encode_prefixed(bytes)),
            Self::Hex(string) => {
                let Some(digits) = string.strip_prefix("0x") else {
                    return Err(format!("`{string}` is not a 0x prefixed hex string"));
                };
                if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
                    return Err(format!("`{string}` contains non hex characters"));
                }
                Ok(string.clone())
            }
        }
    }
}

impl From<Bytes> for ValidBytes {
    fn from(value: Bytes) -> Self {
        Self::Raw(value)
    }
}

impl From<Vec<u8>> for ValidBytes {
    fn from(value: Vec<u8>) -> Self {
        Self::Raw(value.into())
    }
}

impl From<&[u8]> for ValidBytes {
    fn from(value: &[u8]) -> Self {
        Self::Raw(Bytes::copy_from_slice(value))
    }
}

impl<const N: usize> From<[u8; N]> for ValidBytes {
    fn from(value: [u8; N]) -> Self {
        Self::Raw(Bytes::copy_from_slice(&value))
    }
}

impl From<B256> for ValidBytes {
    fn from(value: B256) -> Self {
        Self::Raw(Bytes::copy_from_slice(value.as_slice()))
    }
}

impl From<String> for ValidBytes {
    fn from(value: String) -> Self {
        Self::Hex(value)
    }
}

impl From<&str> for ValidBytes {
    fn from(value: &str) -> Self {
        Self::Hex(value.to_owned())
    }
}

/// The forking target of `anvil_reset`: a remote endpoint and/or the block to fork from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forking {
    #[serde(default)]
    pub json_rpc_url: Option<String>,
    #[serde(default)]
    pub block_number: Option<u64>,
}

impl Forking {
    pub fn new(json_rpc_url: impl Into<String>) -> Self {
        Self {
            json_rpc_url: Some(json_rpc_url.into()),
            block_number: None,
        }
    }

    pub fn at_block(block_number: u64) -> Self {
        Self {
            json_rpc_url: None,
            block_number: Some(block_number),
        }
    }

    pub fn with_block_number(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }
}
