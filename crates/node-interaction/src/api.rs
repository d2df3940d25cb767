//! Typed wrappers around the anvil methods, available on every [`JsonRpcTransport`].

use alloy::primitives::{Address, Bytes, U256};
use serde_json::Value;
use tracing::debug;

use crate::{
    AnvilMethod, Argument, FormattedResult, Forking, JsonRpcRequest, JsonRpcTransport, RpcError,
    ValidBytes, format_arguments,
};

/// The decoded result of an anvil method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnvilResponse {
    method: AnvilMethod,
    result: FormattedResult,
}

impl AnvilResponse {
    pub fn method(&self) -> AnvilMethod {
        self.method
    }

    pub fn result(&self) -> &FormattedResult {
        &self.result
    }

    pub fn into_unit(self) -> Result<(), RpcError> {
        Ok(())
    }

    pub fn into_bool(self) -> Result<bool, RpcError> {
        match self.result {
            FormattedResult::Bool(value) => Ok(value),
            other => Err(mismatch(self.method, "a boolean", other)),
        }
    }

    pub fn into_optional_bytes(self) -> Result<Option<Bytes>, RpcError> {
        match self.result {
            FormattedResult::OptionalBytes(value) => Ok(value),
            other => Err(mismatch(self.method, "optional bytes", other)),
        }
    }

    pub fn into_bytes(self) -> Result<Bytes, RpcError> {
        match self.result {
            FormattedResult::Bytes(value) => Ok(value),
            other => Err(mismatch(self.method, "bytes", other)),
        }
    }

    pub fn into_quantity(self) -> Result<U256, RpcError> {
        match self.result {
            FormattedResult::Quantity(value) => Ok(value),
            other => Err(mismatch(self.method, "a quantity", other)),
        }
    }

    pub fn into_raw(self) -> Result<Value, RpcError> {
        match self.result {
            FormattedResult::Raw(value) => Ok(value),
            other => Err(mismatch(self.method, "a JSON value", other)),
        }
    }
}

fn mismatch(method: AnvilMethod, expected: &str, result: FormattedResult) -> RpcError {
    RpcError::Decode {
        method,
        reason: format!("expected {expected}, decoded {result:?}"),
    }
}

/// The anvil methods. Each call is a single request and response, nothing is retried.
pub trait AnvilApi: JsonRpcTransport {
    /// Sends `method` with the given positional arguments and decodes its result according to
    /// the method's descriptor.
    fn anvil_request(
        &self,
        method: AnvilMethod,
        arguments: Vec<Argument>,
    ) -> Result<AnvilResponse, RpcError> {
        let descriptor = method.descriptor();
        let params = format_arguments(method, descriptor.arguments, arguments)?;
        let request = JsonRpcRequest::new(method.as_str(), params);
        debug!(%method, params = ?request.params, "Sending anvil request");

        let response = self
            .call(&request)
            .map_err(|source| RpcError::Transport { method, source })?;
        let value = response
            .into_result()
            .map_err(|error| RpcError::Method {
                method,
                code: error.code,
                message: error.message,
                data: error.data,
            })?;
        let result = descriptor
            .result
            .format(value)
            .map_err(|reason| RpcError::Decode { method, reason })?;
        Ok(AnvilResponse { method, result })
    }

    fn impersonate_account(&self, address: Address) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::ImpersonateAccount, vec![address.into()])?
            .into_unit()
    }

    fn stop_impersonating_account(&self, address: Address) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::StopImpersonatingAccount, vec![address.into()])?
            .into_unit()
    }

    /// When enabled every account can send transactions without being impersonated first.
    fn auto_impersonate_account(&self, enabled: bool) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::AutoImpersonateAccount, vec![enabled.into()])?
            .into_unit()
    }

    fn get_auto_mine(&self) -> Result<bool, RpcError> {
        self.anvil_request(AnvilMethod::GetAutomine, vec![])?
            .into_bool()
    }

    fn set_auto_mine(&self, enabled: bool) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetAutomine, vec![enabled.into()])?
            .into_unit()
    }

    /// Mines `blocks` blocks (one if `None`) spaced by `interval` seconds.
    fn mine(&self, blocks: Option<u64>, interval: Option<u64>) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::Mine, vec![blocks.into(), interval.into()])?
            .into_unit()
    }

    /// Mines a block every `seconds` seconds, `0` turns interval mining off.
    fn set_interval_mining(&self, seconds: u64) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetIntervalMining, vec![seconds.into()])?
            .into_unit()
    }

    fn drop_transaction(
        &self,
        transaction_hash: impl Into<ValidBytes>,
    ) -> Result<Option<Bytes>, RpcError> {
        self.anvil_request(
            AnvilMethod::DropTransaction,
            vec![Argument::Bytes(transaction_hash.into())],
        )?
        .into_optional_bytes()
    }

    /// Resets the chain. Without a forking target the node's current fork (if any) is reset.
    fn reset(&self, forking: Option<Forking>) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::Reset, vec![forking.into()])?
            .into_unit()
    }

    fn set_rpc_url(&self, url: impl Into<String>) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetRpcUrl, vec![Argument::Text(url.into())])?
            .into_unit()
    }

    fn set_chain_id(&self, chain_id: u64) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetChainId, vec![chain_id.into()])?
            .into_unit()
    }

    fn set_balance(&self, address: Address, balance: U256) -> Result<(), RpcError> {
        self.anvil_request(
            AnvilMethod::SetBalance,
            vec![address.into(), balance.into()],
        )?
        .into_unit()
    }

    fn set_code(&self, address: Address, code: impl Into<ValidBytes>) -> Result<(), RpcError> {
        self.anvil_request(
            AnvilMethod::SetCode,
            vec![address.into(), Argument::Bytes(code.into())],
        )?
        .into_unit()
    }

    fn set_nonce(&self, address: Address, nonce: u64) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetNonce, vec![address.into(), nonce.into()])?
            .into_unit()
    }

    fn set_storage_at(
        &self,
        address: Address,
        slot: U256,
        value: impl Into<ValidBytes>,
    ) -> Result<bool, RpcError> {
        self.anvil_request(
            AnvilMethod::SetStorageAt,
            vec![address.into(), slot.into(), Argument::Bytes(value.into())],
        )?
        .into_bool()
    }

    fn set_coinbase(&self, address: Address) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetCoinbase, vec![address.into()])?
            .into_unit()
    }

    fn set_logging_enabled(&self, enabled: bool) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetLoggingEnabled, vec![enabled.into()])?
            .into_unit()
    }

    fn set_min_gas_price(&self, gas_price: U256) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetMinGasPrice, vec![gas_price.into()])?
            .into_unit()
    }

    fn set_next_block_base_fee_per_gas(&self, base_fee: U256) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetNextBlockBaseFeePerGas, vec![base_fee.into()])?
            .into_unit()
    }

    /// The node's state as an opaque blob that [`AnvilApi::load_state`] accepts.
    fn dump_state(&self) -> Result<Bytes, RpcError> {
        self.anvil_request(AnvilMethod::DumpState, vec![])?
            .into_bytes()
    }

    fn load_state(&self, state: impl Into<ValidBytes>) -> Result<bool, RpcError> {
        self.anvil_request(AnvilMethod::LoadState, vec![Argument::Bytes(state.into())])?
            .into_bool()
    }

    fn node_info(&self) -> Result<Value, RpcError> {
        self.anvil_request(AnvilMethod::NodeInfo, vec![])?
            .into_raw()
    }

    /// Returns the id of the snapshot, to be passed to [`AnvilApi::revert`].
    fn snapshot(&self) -> Result<U256, RpcError> {
        self.anvil_request(AnvilMethod::Snapshot, vec![])?
            .into_quantity()
    }

    fn revert(&self, snapshot_id: U256) -> Result<bool, RpcError> {
        self.anvil_request(AnvilMethod::Revert, vec![snapshot_id.into()])?
            .into_bool()
    }

    fn increase_time(&self, seconds: u64) -> Result<Value, RpcError> {
        self.anvil_request(AnvilMethod::IncreaseTime, vec![seconds.into()])?
            .into_raw()
    }

    fn set_next_block_timestamp(&self, timestamp: u64) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetNextBlockTimestamp, vec![timestamp.into()])?
            .into_unit()
    }

    fn set_block_timestamp_interval(&self, seconds: u64) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::SetBlockTimestampInterval, vec![seconds.into()])?
            .into_unit()
    }

    fn set_block_gas_limit(&self, gas_limit: u64) -> Result<bool, RpcError> {
        self.anvil_request(AnvilMethod::SetBlockGasLimit, vec![gas_limit.into()])?
            .into_bool()
    }

    fn remove_block_timestamp_interval(&self) -> Result<bool, RpcError> {
        self.anvil_request(AnvilMethod::RemoveBlockTimestampInterval, vec![])?
            .into_bool()
    }

    fn evm_mine(&self) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::EvmMine, vec![])?
            .into_unit()
    }

    fn enable_traces(&self) -> Result<(), RpcError> {
        self.anvil_request(AnvilMethod::EnableTraces, vec![])?
            .into_unit()
    }

    /// Sends a transaction from any account without a signature, returning its hash.
    fn send_unsigned_transaction(&self, transaction: Value) -> Result<Bytes, RpcError> {
        self.anvil_request(AnvilMethod::SendUnsignedTransaction, vec![transaction.into()])?
            .into_bytes()
    }

    fn txpool_status(&self) -> Result<Value, RpcError> {
        self.anvil_request(AnvilMethod::TxpoolStatus, vec![])?
            .into_raw()
    }

    fn txpool_inspect(&self) -> Result<Value, RpcError> {
        self.anvil_request(AnvilMethod::TxpoolInspect, vec![])?
            .into_raw()
    }

    fn txpool_content(&self) -> Result<Value, RpcError> {
        self.anvil_request(AnvilMethod::TxpoolContent, vec![])?
            .into_raw()
    }
}

impl<T: JsonRpcTransport + ?Sized> AnvilApi for T {}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use alloy::primitives::{B256, address};
    use serde_json::json;

    use super::*;
    use crate::{JsonRpcErrorObject, JsonRpcResponse};

    const ACCOUNT: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

    /// Records the requests it receives and answers them from a queue of canned responses.
    #[derive(Default)]
    struct RecordingTransport {
        requests: Mutex<Vec<JsonRpcRequest>>,
        responses: Mutex<VecDeque<anyhow::Result<Result<Value, JsonRpcErrorObject>>>>,
    }

    impl RecordingTransport {
        fn answering(result: Value) -> Self {
            let transport = Self::default();
            transport.push(Ok(Ok(result)));
            transport
        }

        fn push(&self, response: anyhow::Result<Result<Value, JsonRpcErrorObject>>) {
            self.responses
                .lock()
                .expect("Poisoned")
                .push_back(response);
        }

        fn last_request(&self) -> JsonRpcRequest {
            self.requests
                .lock()
                .expect("Poisoned")
                .last()
                .cloned()
                .expect("No request was sent")
        }
    }

    impl JsonRpcTransport for RecordingTransport {
        fn call(&self, request: &JsonRpcRequest) -> anyhow::Result<JsonRpcResponse> {
            self.requests.lock().expect("Poisoned").push(request.clone());
            let response = self
                .responses
                .lock()
                .expect("Poisoned")
                .pop_front()
                .unwrap_or(Ok(Ok(Value::Null)))?;
            Ok(match response {
                Ok(result) => JsonRpcResponse::success(request.id.clone(), result),
                Err(error) => JsonRpcResponse::failure(request.id.clone(), error),
            })
        }
    }

    #[test]
    fn set_balance_sends_a_lowercase_address_and_a_hex_quantity() {
        // Arrange
        let transport = RecordingTransport::default();

        // Act
        let result = transport.set_balance(ACCOUNT, U256::from(1000));

        // Assert
        result.expect("Failed to set the balance");
        let request = transport.last_request();
        assert_eq!(request.method, "anvil_setBalance");
        assert_eq!(
            request.params,
            vec![
                json!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
                json!("0x3e8")
            ]
        );
    }

    #[test]
    fn set_storage_at_encodes_the_slot_and_the_value() {
        // Arrange
        let transport = RecordingTransport::answering(json!(true));
        let mut value = [0u8; 32];
        value[31] = 0x10;

        // Act
        let result = transport.set_storage_at(ACCOUNT, U256::from(9), B256::from(value));

        // Assert
        assert!(result.expect("Failed to set the storage"));
        assert_eq!(
            transport.last_request().params,
            vec![
                json!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
                json!("0x9"),
                json!(format!("0x{}10", "00".repeat(31)))
            ]
        );
    }

    #[test]
    fn drop_transaction_decodes_missing_and_found_transactions() {
        // Arrange
        let transport = RecordingTransport::default();
        transport.push(Ok(Ok(Value::Null)));
        transport.push(Ok(Ok(json!("0xabcd"))));

        // Act
        let missing = transport.drop_transaction("0x01");
        let found = transport.drop_transaction("0xabcd");

        // Assert
        assert_eq!(missing.expect("Failed to drop"), None);
        assert_eq!(
            found.expect("Failed to drop"),
            Some(Bytes::from(vec![0xab, 0xcd]))
        );
    }

    #[test]
    fn reset_without_a_target_sends_no_params() {
        // Arrange
        let transport = RecordingTransport::default();

        // Act
        transport.reset(None).expect("Failed to reset");

        // Assert
        let request = transport.last_request();
        assert_eq!(request.method, "anvil_reset");
        assert!(request.params.is_empty());
    }

    #[test]
    fn reset_to_a_block_sends_a_hex_block_number() {
        // Arrange
        let transport = RecordingTransport::default();

        // Act
        transport
            .reset(Some(Forking::at_block(100)))
            .expect("Failed to reset");

        // Assert
        assert_eq!(
            transport.last_request().params,
            vec![json!({ "block_number": "0x64" })]
        );
    }

    #[test]
    fn mine_with_only_an_interval_keeps_the_block_count_position() {
        // Arrange
        let transport = RecordingTransport::default();

        // Act
        transport.mine(None, Some(5)).expect("Failed to mine");

        // Assert
        assert_eq!(
            transport.last_request().params,
            vec![Value::Null, json!("0x5")]
        );
    }

    #[test]
    fn snapshots_decode_to_quantities() {
        let transport = RecordingTransport::answering(json!("0x1"));
        assert_eq!(transport.snapshot().expect("Failed to snapshot"), U256::from(1));
    }

    #[test]
    fn error_objects_become_method_errors() {
        // Arrange
        let transport = RecordingTransport::default();
        transport.push(Ok(Err(JsonRpcErrorObject {
            code: -32603,
            message: "not supported".into(),
            data: None,
        })));

        // Act
        let result = transport.set_chain_id(1);

        // Assert
        match result {
            Err(RpcError::Method {
                method,
                code,
                message,
                ..
            }) => {
                assert_eq!(method, AnvilMethod::SetChainId);
                assert_eq!(code, -32603);
                assert_eq!(message, "not supported");
            }
            other => panic!("Unexpected result {other:?}"),
        }
    }

    #[test]
    fn transport_failures_become_transport_errors() {
        // Arrange
        let transport = RecordingTransport::default();
        transport.push(Err(anyhow::anyhow!("connection refused")));

        // Act
        let result = transport.node_info();

        // Assert
        assert!(matches!(
            result,
            Err(RpcError::Transport {
                method: AnvilMethod::NodeInfo,
                ..
            })
        ));
    }

    #[test]
    fn undecodable_results_become_decode_errors() {
        let transport = RecordingTransport::answering(json!("yes"));
        assert!(matches!(
            transport.get_auto_mine(),
            Err(RpcError::Decode {
                method: AnvilMethod::GetAutomine,
                ..
            })
        ));
    }

    #[test]
    fn too_many_raw_arguments_are_rejected_before_sending() {
        // Arrange
        let transport = RecordingTransport::default();

        // Act
        let result = transport.anvil_request(
            AnvilMethod::Snapshot,
            vec![Argument::from(1u64)],
        );

        // Assert
        assert!(matches!(result, Err(RpcError::Arguments { .. })));
        assert!(transport.requests.lock().expect("Poisoned").is_empty());
    }
}
