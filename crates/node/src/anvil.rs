//! The anvil node implementation.

use std::{
    path::PathBuf,
    process::{Command, ExitStatus, Stdio},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU32, Ordering},
    },
    time::{Duration, Instant},
};

use anvil_dt_config::{
    AnvilConfiguration, CommandLine, ResolvedAnvilConfiguration, SupervisorConfiguration,
};
use anvil_dt_node_interaction::HttpTransport;
use anyhow::Context as _;
use tracing::{debug, error, info, instrument};

use crate::{
    LivelinessProbe, Node, NodeError, OutputBehavior, Process, ProbeFailure, ShutdownHookGuard,
    ShutdownHooks,
};

static NODE_COUNT: AtomicU32 = AtomicU32::new(0);

/// Where the node is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Liveliness {
    /// The node was not spawned yet or it's spawned but didn't answer yet.
    Pending,
    /// The node answered RPC requests.
    Live,
    /// The node process was terminated.
    Terminated,
}

/// Supervises a local anvil node process.
///
/// The host, port and URLs of the node are known as soon as it's created. The process is
/// terminated when the value is dropped and, if auto exit is enabled, when the shutdown hooks it
/// was given run.
#[derive(Debug)]
pub struct AnvilNode {
    id: u32,
    binary_path: PathBuf,
    configuration: ResolvedAnvilConfiguration,
    command_line: CommandLine,
    output_behavior: OutputBehavior,
    liveliness_timeout: Duration,
    liveliness_interval: Duration,
    auto_exit: bool,
    shutdown_hooks: Option<ShutdownHooks>,
    shutdown_hook_guard: Option<ShutdownHookGuard>,
    process: Arc<Mutex<Option<Process>>>,
    liveliness: Liveliness,
}

impl AnvilNode {
    /// The time the node is given to exit after SIGTERM before it's killed.
    const TERMINATION_GRACE_PERIOD: Duration = Duration::from_secs(5);
    /// The timeout of every single liveliness request.
    const PROBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

    const LOG_FILE_PREFIX: &'static str = "anvil";

    /// Resolves the node configuration without starting anything.
    pub fn new(
        context: impl AsRef<SupervisorConfiguration> + AsRef<AnvilConfiguration>,
    ) -> Result<Self, NodeError> {
        let supervisor_configuration = AsRef::<SupervisorConfiguration>::as_ref(&context);
        let anvil_configuration = AsRef::<AnvilConfiguration>::as_ref(&context);

        let id = NODE_COUNT.fetch_add(1, Ordering::SeqCst);
        let configuration = anvil_configuration.resolve()?;

        let output_behavior = match (
            supervisor_configuration.logs_directory.as_ref(),
            supervisor_configuration.suppress_output,
        ) {
            (Some(directory), _) => OutputBehavior::LogFiles {
                directory: directory.clone(),
                prefix: format!("{}_{id}", Self::LOG_FILE_PREFIX),
            },
            (None, true) => OutputBehavior::Suppress,
            (None, false) => OutputBehavior::Inherit,
        };

        Ok(Self {
            id,
            binary_path: supervisor_configuration.binary_path.clone(),
            command_line: configuration.command_line(),
            configuration,
            output_behavior,
            liveliness_timeout: supervisor_configuration.liveliness_timeout(),
            liveliness_interval: supervisor_configuration.liveliness_interval(),
            auto_exit: supervisor_configuration.auto_exit,
            shutdown_hooks: None,
            shutdown_hook_guard: None,
            process: Default::default(),
            liveliness: Liveliness::Pending,
        })
    }

    /// The registry in which the node registers its termination when auto exit is enabled.
    pub fn with_shutdown_hooks(mut self, shutdown_hooks: ShutdownHooks) -> Self {
        self.shutdown_hooks = Some(shutdown_hooks);
        self
    }

    /// Creates the node and blocks until it answers RPC requests.
    pub fn start(
        context: impl AsRef<SupervisorConfiguration> + AsRef<AnvilConfiguration>,
        shutdown_hooks: Option<ShutdownHooks>,
    ) -> Result<Self, NodeError> {
        let mut node = Self::new(context)?;
        node.shutdown_hooks = shutdown_hooks;
        node.launch()?;
        Ok(node)
    }

    /// Spawns the node process and waits for it to be live. Does nothing if it's already live.
    #[instrument(level = "info", skip_all, fields(anvil_node_id = self.id))]
    pub fn launch(&mut self) -> Result<(), NodeError> {
        if self.liveliness() == Liveliness::Live {
            return Ok(());
        }
        self.spawn_process()?.wait_live()?;
        Ok(())
    }

    #[instrument(level = "info", skip_all, fields(anvil_node_id = self.id))]
    fn spawn_process(&mut self) -> Result<&mut Self, NodeError> {
        debug!(
            binary = %self.binary_path.display(),
            command_line = %self.command_line,
            "Spawning the anvil node"
        );

        let process = Process::spawn(
            &self.binary_path,
            self.command_line.iter(),
            &self.output_behavior,
        )
        .map_err(|source| {
            error!(?source, "Failed to spawn the anvil node");
            NodeError::Launch {
                binary: self.binary_path.clone(),
                source,
            }
        })?;
        *self.process_slot() = Some(process);
        self.liveliness = Liveliness::Pending;

        match (self.auto_exit, self.shutdown_hooks.as_ref()) {
            (true, Some(shutdown_hooks)) if self.shutdown_hook_guard.is_none() => {
                let process = self.process.clone();
                let id = self.id;
                self.shutdown_hook_guard = Some(shutdown_hooks.register(move || {
                    debug!(anvil_node_id = id, "Terminating the anvil node on shutdown");
                    terminate(&process);
                }));
            }
            _ => {}
        }

        Ok(self)
    }

    /// Blocks until the node answers a liveliness request.
    #[instrument(level = "info", skip_all, fields(anvil_node_id = self.id))]
    fn wait_live(&mut self) -> Result<&mut Self, NodeError> {
        let url = self.http_url();
        let transport = HttpTransport::with_timeout(url.clone(), Self::PROBE_REQUEST_TIMEOUT)
            .map_err(|source| self.launch_error(source))?;
        let probe = LivelinessProbe::new(
            transport,
            self.liveliness_timeout,
            self.liveliness_interval,
        );

        let start = Instant::now();
        let process = self.process.clone();
        let result = probe.wait(|| exit_status(&process));

        match result {
            Ok(attempts) => {
                info!(
                    %url,
                    attempts,
                    elapsed = ?start.elapsed(),
                    "The anvil node is live"
                );
                self.liveliness = Liveliness::Live;
                Ok(self)
            }
            Err(failure) => {
                let error = match failure {
                    ProbeFailure::TimedOut { attempts, elapsed } => {
                        error!(%url, attempts, ?elapsed, "The anvil node didn't become live");
                        NodeError::StartupTimeout {
                            url,
                            timeout: self.liveliness_timeout,
                        }
                    }
                    ProbeFailure::Exited(status) => {
                        error!(%status, "The anvil node exited before it became live");
                        self.launch_error(anyhow::anyhow!(
                            "The node exited with {status} before answering RPC requests"
                        ))
                    }
                };
                self.kill();
                Err(error)
            }
        }
    }

    fn launch_error(&self, source: anyhow::Error) -> NodeError {
        NodeError::Launch {
            binary: self.binary_path.clone(),
            source,
        }
    }

    /// Terminates the node process. Calling it more than once is fine.
    #[instrument(level = "info", skip_all, fields(anvil_node_id = self.id))]
    pub fn kill(&mut self) {
        terminate(&self.process);
        self.shutdown_hook_guard = None;
        self.liveliness = Liveliness::Terminated;
    }

    fn process_slot(&self) -> MutexGuard<'_, Option<Process>> {
        lock(&self.process)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn liveliness(&self) -> Liveliness {
        match self.liveliness {
            // The shutdown hooks may have terminated the process behind our back.
            Liveliness::Live if self.process_slot().is_none() => Liveliness::Terminated,
            liveliness => liveliness,
        }
    }

    /// The exit status of the node process if it exited on its own.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        exit_status(&self.process)
    }

    pub fn configuration(&self) -> &ResolvedAnvilConfiguration {
        &self.configuration
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.command_line
    }

    pub fn host(&self) -> &str {
        self.configuration.host()
    }

    pub fn port(&self) -> u16 {
        self.configuration.port()
    }

    /// `host:port` of the node.
    pub fn url(&self) -> String {
        self.configuration.url()
    }

    pub fn http_url(&self) -> String {
        self.configuration.http_url()
    }

    pub fn ws_url(&self) -> String {
        self.configuration.ws_url()
    }

    /// A transport for the node's HTTP endpoint.
    pub fn http_transport(&self) -> anyhow::Result<HttpTransport> {
        HttpTransport::new(self.http_url())
    }
}

fn lock(process: &Mutex<Option<Process>>) -> MutexGuard<'_, Option<Process>> {
    process.lock().unwrap_or_else(PoisonError::into_inner)
}

fn terminate(process: &Mutex<Option<Process>>) {
    let Some(mut process) = lock(process).take() else {
        return;
    };
    match process.terminate(AnvilNode::TERMINATION_GRACE_PERIOD) {
        Ok(status) => debug!(%status, "The anvil node exited"),
        Err(error) => debug!(?error, "Failed to terminate the anvil node"),
    }
}

fn exit_status(process: &Mutex<Option<Process>>) -> Option<ExitStatus> {
    match lock(process).as_mut()?.try_wait() {
        Ok(status) => status,
        Err(error) => {
            debug!(?error, "Failed to query the status of the anvil node");
            None
        }
    }
}

impl Node for AnvilNode {
    #[instrument(level = "info", skip_all, fields(anvil_node_id = self.id))]
    fn spawn(&mut self) -> anyhow::Result<()> {
        self.launch().context("Failed to start the anvil node")
    }

    #[instrument(level = "info", skip_all, fields(anvil_node_id = self.id))]
    fn shutdown(&mut self) -> anyhow::Result<()> {
        self.kill();
        Ok(())
    }

    #[instrument(level = "info", skip_all, fields(anvil_node_id = self.id))]
    fn version(&self) -> anyhow::Result<String> {
        let output = Command::new(&self.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn anvil --version process")?
            .wait_with_output()
            .context("Failed to wait for anvil --version output")?
            .stdout;
        Ok(String::from_utf8_lossy(&output).trim().into())
    }
}

impl Drop for AnvilNode {
    #[instrument(level = "info", skip_all, fields(anvil_node_id = self.id))]
    fn drop(&mut self) {
        self.kill();
    }
}
