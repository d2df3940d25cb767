//! alloy providers need a tokio runtime while the node supervisor and the RPC façade are fully
//! synchronous. All of the async work is funnelled through the executor in this module.

use std::{any::Any, panic::AssertUnwindSafe, pin::Pin, thread};

use futures::FutureExt;
use once_cell::sync::Lazy;
use tokio::{
    runtime::Builder,
    sync::{mpsc::UnboundedSender, oneshot},
};
use tracing::Instrument;

type BoxedOutput = Box<dyn Any + Send>;
type TaskResult = Result<BoxedOutput, Box<dyn Any + Send>>;

/// A process wide executor that drives futures to completion on a dedicated runtime thread and
/// hands the output back to the calling thread.
///
/// ```rust
/// use anvil_dt_common::concepts::BlockingExecutor;
///
/// let value = BlockingExecutor::execute(async move { 0xFFu8 }).expect("Computation failed");
/// assert_eq!(value, 0xFF);
/// ```
///
/// Panics raised inside of the future are caught and reported as errors so that a misbehaving
/// RPC call can't take the runtime thread down with it.
///
/// This must not be called from within an async context since the calling thread blocks on the
/// response channel.
pub struct BlockingExecutor;

impl BlockingExecutor {
    pub fn execute<R>(future: impl Future<Output = R> + Send + 'static) -> anyhow::Result<R>
    where
        R: Send + 'static,
    {
        static STATE: Lazy<ExecutorState> = Lazy::new(ExecutorState::start);

        let (response_tx, response_rx) = oneshot::channel::<TaskResult>();
        let future =
            Box::pin(async move { Box::new(future.await) as BoxedOutput }.in_current_span());

        if let Err(error) = STATE.tx.send(TaskMessage {
            future,
            response_tx,
        }) {
            tracing::error!(?error, "Failed to send the task to the blocking executor");
            anyhow::bail!("Failed to send the task to the blocking executor: {error:?}")
        }

        let output = match response_rx.blocking_recv() {
            Ok(Ok(output)) => output,
            Ok(Err(panic)) => {
                tracing::error!(?panic, "The task panicked on the blocking executor");
                anyhow::bail!("The task panicked on the blocking executor: {panic:?}")
            }
            Err(error) => {
                tracing::error!(
                    ?error,
                    "Failed to get the response from the blocking executor"
                );
                anyhow::bail!("Failed to get the response from the blocking executor: {error:?}")
            }
        };

        Ok(*output
            .downcast::<R>()
            .expect("The blocking executor returned a value of the wrong type. This is a bug"))
    }
}

/// The sending half of the channel that feeds the runtime thread.
struct ExecutorState {
    tx: UnboundedSender<TaskMessage>,
}

impl ExecutorState {
    fn start() -> Self {
        tracing::trace!("Initializing the BlockingExecutor state");
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<TaskMessage>();

        thread::Builder::new()
            .name("anvil-dt-executor".into())
            .spawn(move || {
                tracing::debug!(
                    thread_id = ?thread::current().id(),
                    "Starting async runtime thread"
                );

                let runtime = Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("Failed to create the async runtime");

                runtime.block_on(async move {
                    while let Some(TaskMessage {
                        future,
                        response_tx,
                    }) = rx.recv().await
                    {
                        tokio::spawn(async move {
                            let result = AssertUnwindSafe(future).catch_unwind().await;
                            let _ = response_tx.send(result);
                        });
                    }
                })
            })
            .expect("Failed to spawn the async runtime thread");

        Self { tx }
    }
}

struct TaskMessage {
    future: Pin<Box<dyn Future<Output = BoxedOutput> + Send>>,
    response_tx: oneshot::Sender<TaskResult>,
}
