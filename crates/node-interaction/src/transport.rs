use std::{sync::Arc, time::Duration};

use anyhow::Context as _;

use crate::{JsonRpcRequest, JsonRpcResponse};

/// A client that is able to deliver a JSON-RPC request to a node and return its response.
///
/// An `Ok` result means that the node answered with a well formed JSON-RPC response, which may
/// still carry an error object. Failing to reach the node or to parse what it sent back is an
/// `Err`.
pub trait JsonRpcTransport {
    fn call(&self, request: &JsonRpcRequest) -> anyhow::Result<JsonRpcResponse>;

    /// Like [`JsonRpcTransport::call`] but gives up once the timeout elapses, if the transport is
    /// able to bound a single request.
    fn call_within(
        &self,
        request: &JsonRpcRequest,
        _timeout: Duration,
    ) -> anyhow::Result<JsonRpcResponse> {
        self.call(request)
    }
}

impl<T: JsonRpcTransport + ?Sized> JsonRpcTransport for &T {
    fn call(&self, request: &JsonRpcRequest) -> anyhow::Result<JsonRpcResponse> {
        (**self).call(request)
    }

    fn call_within(
        &self,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> anyhow::Result<JsonRpcResponse> {
        (**self).call_within(request, timeout)
    }
}

impl<T: JsonRpcTransport + ?Sized> JsonRpcTransport for Box<T> {
    fn call(&self, request: &JsonRpcRequest) -> anyhow::Result<JsonRpcResponse> {
        (**self).call(request)
    }

    fn call_within(
        &self,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> anyhow::Result<JsonRpcResponse> {
        (**self).call_within(request, timeout)
    }
}

impl<T: JsonRpcTransport + ?Sized> JsonRpcTransport for Arc<T> {
    fn call(&self, request: &JsonRpcRequest) -> anyhow::Result<JsonRpcResponse> {
        (**self).call(request)
    }

    fn call_within(
        &self,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> anyhow::Result<JsonRpcResponse> {
        (**self).call_within(request, timeout)
    }
}

/// A blocking JSON-RPC over HTTP transport.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    url: String,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_timeout(url, Self::DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a transport whose requests fail once `timeout` elapses.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build the HTTP client")?;
        Ok(Self {
            url: url.into(),
            timeout,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HttpTransport {
    fn send(
        &self,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> anyhow::Result<JsonRpcResponse> {
        self.client
            .post(&self.url)
            .timeout(timeout)
            .json(request)
            .send()
            .with_context(|| format!("Failed to POST the `{}` request to {}", request.method, self.url))?
            .error_for_status()
            .with_context(|| format!("The node at {} answered with an error status", self.url))?
            .json::<JsonRpcResponse>()
            .with_context(|| format!("Failed to deserialize the `{}` response", request.method))
    }
}

impl JsonRpcTransport for HttpTransport {
    fn call(&self, request: &JsonRpcRequest) -> anyhow::Result<JsonRpcResponse> {
        self.send(request, self.timeout)
    }

    /// The request is bounded by the shorter of `timeout` and the transport's own timeout.
    fn call_within(
        &self,
        request: &JsonRpcRequest,
        timeout: Duration,
    ) -> anyhow::Result<JsonRpcResponse> {
        self.send(request, timeout.min(self.timeout))
    }
}
