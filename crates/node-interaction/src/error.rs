use serde_json::Value;

use crate::AnvilMethod;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The node answered the request with a JSON-RPC error object.
    #[error("the `{method}` request failed with error {code}: {message}")]
    Method {
        method: AnvilMethod,
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The request didn't reach the node or its response couldn't be read.
    #[error("failed to send the `{method}` request")]
    Transport {
        method: AnvilMethod,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid arguments for `{method}`: {reason}")]
    Arguments { method: AnvilMethod, reason: String },

    #[error("failed to decode the result of `{method}`: {reason}")]
    Decode { method: AnvilMethod, reason: String },
}

impl RpcError {
    pub fn method(&self) -> AnvilMethod {
        match self {
            Self::Method { method, .. }
            | Self::Transport { method, .. }
            | Self::Arguments { method, .. }
            | Self::Decode { method, .. } => *method,
        }
    }
}
