use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anvil_dt_common::concepts::BlockingExecutor;
use anyhow::Context as _;
use serde_json::Value;

use crate::{JsonRpcErrorObject, JsonRpcRequest, JsonRpcResponse, JsonRpcTransport};

/// Sends the anvil requests through an alloy [`Provider`], so the anvil methods can be used next
/// to the provider's own account and transaction API.
#[derive(Clone)]
pub struct ProviderTransport {
    provider: DynProvider,
}

impl ProviderTransport {
    pub fn new(provider: impl Provider + 'static) -> Self {
        Self {
            provider: provider.erased(),
        }
    }

    /// Connects a provider with the recommended fillers to the given connection string.
    pub fn connect(connection_string: &str) -> anyhow::Result<Self> {
        let connection_string = connection_string.to_owned();
        let provider = BlockingExecutor::execute(async move {
            ProviderBuilder::new()
                .connect(&connection_string)
                .await
                .with_context(|| format!("Failed to connect the provider to {connection_string}"))
        })??;
        Ok(Self::new(provider))
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

impl JsonRpcTransport for ProviderTransport {
    fn call(&self, request: &JsonRpcRequest) -> anyhow::Result<JsonRpcResponse> {
        let provider = self.provider.clone();
        let method = request.method.clone();
        let params = request.params.clone();

        let result = BlockingExecutor::execute(async move {
            provider.raw_request::<_, Value>(method.into(), params).await
        })
        .context("Failed to execute the request on the blocking executor")?;

        match result {
            Ok(result) => Ok(JsonRpcResponse::success(request.id.clone(), result)),
            Err(error) => match error.as_error_resp() {
                Some(payload) => Ok(JsonRpcResponse::failure(
                    request.id.clone(),
                    JsonRpcErrorObject {
                        code: payload.code,
                        message: payload.message.to_string(),
                        data: payload
                            .data
                            .as_ref()
                            .and_then(|data| serde_json::from_str(data.get()).ok()),
                    },
                )),
                None => Err(anyhow::Error::new(error))
                    .with_context(|| format!("The provider failed to send `{}`", request.method)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::transports::mock::Asserter;

    use super::*;
    use crate::{AnvilApi, AnvilMethod, RpcError};

    fn mocked_transport() -> (Asserter, ProviderTransport) {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        (asserter, ProviderTransport::new(provider))
    }

    #[test]
    fn results_are_decoded() {
        // Arrange
        let (asserter, transport) = mocked_transport();
        asserter.push_success(&true);

        // Act
        let auto_mine = transport.get_auto_mine();

        // Assert
        assert!(auto_mine.expect("Failed to get the auto mine status"));
    }

    #[test]
    fn error_payloads_become_method_errors() {
        // Arrange
        let (asserter, transport) = mocked_transport();
        asserter.push_failure_msg("nope");

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
                assert_eq!(message, "nope");
            }
            other => panic!("expected a method error, got {other:?}"),
        }
    }

    #[test]
    fn unanswered_requests_are_transport_errors() {
        // Arrange
        let (_asserter, transport) = mocked_transport();

        // Act
        let result = transport.get_auto_mine();

        // Assert
        assert!(matches!(
            result,
            Err(RpcError::Transport {
                method: AnvilMethod::GetAutomine,
                ..
            })
        ));
    }
}
