use std::{
    ops::ControlFlow,
    process::ExitStatus,
    time::{Duration, Instant},
};

use anvil_dt_common::polling::{PollingOutcome, poll_blocking};
use anvil_dt_node_interaction::{JsonRpcRequest, JsonRpcTransport};
use tracing::trace;

/// Blocks until a node answers a `web3_clientVersion` request.
///
/// Any well formed JSON-RPC response counts, including one that carries an error object.
pub struct LivelinessProbe<T> {
    transport: T,
    timeout: Duration,
    interval: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProbeFailure {
    TimedOut { attempts: usize, elapsed: Duration },
    /// The node process exited while it was being probed.
    Exited(ExitStatus),
}

impl<T: JsonRpcTransport> LivelinessProbe<T> {
    const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(1);

    pub fn new(transport: T, timeout: Duration, interval: Duration) -> Self {
        Self {
            transport,
            timeout,
            interval,
        }
    }

    /// Probes the node until it answers, returning the number of requests that were sent.
    ///
    /// `exit_status` is consulted before every attempt so that a node that crashed on startup
    /// fails the probe right away. No single request outlives the deadline.
    pub fn wait(
        &self,
        mut exit_status: impl FnMut() -> Option<ExitStatus>,
    ) -> Result<usize, ProbeFailure> {
        let request = JsonRpcRequest::client_version();
        let deadline = Instant::now() + self.timeout;

        let outcome = poll_blocking(self.timeout, self.interval, || {
            if let Some(status) = exit_status() {
                return Err(ProbeFailure::Exited(status));
            }
            let remaining = deadline
                .saturating_duration_since(Instant::now())
                .max(Self::MIN_ATTEMPT_TIMEOUT);
            match self.transport.call_within(&request, remaining) {
                Ok(_) => Ok(ControlFlow::Break(())),
                Err(error) => {
                    trace!(?error, "The node is not answering yet");
                    Ok(ControlFlow::Continue(()))
                }
            }
        })?;

        match outcome {
            PollingOutcome::Completed { attempts, .. } => Ok(attempts),
            PollingOutcome::TimedOut { attempts, elapsed } => {
                Err(ProbeFailure::TimedOut { attempts, elapsed })
            }
        }
    }
}
