use std::time::Duration;

use anvil_dt_config::Arguments;
use anvil_dt_node::{AnvilNode, ShutdownHooks};
use anyhow::Context as _;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const EXIT_POLLING_INTERVAL: Duration = Duration::from_millis(500);

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let arguments = Arguments::parse();

    let shutdown_hooks = ShutdownHooks::new();
    shutdown_hooks.install_signal_handler()?;

    let node = AnvilNode::start(&arguments, Some(shutdown_hooks.clone()))
        .context("Failed to start the anvil node")?;
    info!(
        http_url = %node.http_url(),
        ws_url = %node.ws_url(),
        command_line = %node.command_line(),
        "Anvil is running, press Ctrl-C to stop it"
    );

    // The signal handler terminates the node and exits the process.
    loop {
        std::thread::sleep(EXIT_POLLING_INTERVAL);
        if let Some(status) = node.exit_status() {
            error!(%status, "The anvil node exited unexpectedly");
            anyhow::bail!("The anvil node exited with {status}");
        }
    }
}
