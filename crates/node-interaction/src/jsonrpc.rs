//! The JSON-RPC 2.0 envelopes exchanged with the node.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

const JSONRPC_VERSION: &str = "2.0";

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    String(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub method: String,
    pub params: Vec<Value>,
    pub id: Id,
    pub jsonrpc: String,
}

impl JsonRpcRequest {
    /// Creates a request with a fresh numeric id.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self::with_id(
            Id::Number(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)),
            method,
            params,
        )
    }

    pub fn with_id(id: Id, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
            id,
            jsonrpc: JSONRPC_VERSION.to_owned(),
        }
    }

    /// The `web3_clientVersion` request used to check that a node answers RPC requests.
    pub fn client_version() -> Self {
        Self::with_id(Id::String("0".into()), "web3_clientVersion", Vec::new())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    pub fn success(id: Id, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: Some(id),
            result,
            error: None,
        }
    }

    pub fn failure(id: Id, error: JsonRpcErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id: Some(id),
            result: Value::Null,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<Value, JsonRpcErrorObject> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn client_version_request_matches_the_wire_format() {
        // Act
        let request = serde_json::to_value(JsonRpcRequest::client_version());

        // Assert
        assert_eq!(
            request.expect("Failed to serialize"),
            json!({
                "method": "web3_clientVersion",
                "params": [],
                "id": "0",
                "jsonrpc": "2.0"
            })
        );
    }

    #[test]
    fn request_ids_are_unique() {
        let first = JsonRpcRequest::new("anvil_nodeInfo", Vec::new());
        let second = JsonRpcRequest::new("anvil_nodeInfo", Vec::new());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn error_responses_surface_the_error_object() {
        // Arrange
        let response = serde_json::from_value::<JsonRpcResponse>(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "error": { "code": -32602, "message": "invalid params" }
        }))
        .expect("Failed to deserialize");

        // Act
        let result = response.into_result();

        // Assert
        assert_eq!(
            result,
            Err(JsonRpcErrorObject {
                code: -32602,
                message: "invalid params".into(),
                data: None
            })
        );
    }

    #[test]
    fn null_results_are_kept_as_null() {
        let response = serde_json::from_value::<JsonRpcResponse>(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": null
        }))
        .expect("Failed to deserialize");
        assert_eq!(response.into_result(), Ok(Value::Null));
    }
}
