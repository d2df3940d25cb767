use std::{
    ffi::OsStr,
    fs::{File, OpenOptions, create_dir_all},
    io::{self, Write},
    ops::ControlFlow,
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    time::Duration,
};

use anvil_dt_common::polling::{PollingOutcome, poll_blocking};
use anyhow::{Context, Result};
use tracing::debug;

/// Where the stdout and stderr of a spawned process go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputBehavior {
    /// Both streams are discarded.
    Suppress,
    /// Both streams are shared with the current process.
    Inherit,
    /// Both streams are written to `{prefix}_stdout.log` and `{prefix}_stderr.log` in the
    /// directory, which is created if missing.
    LogFiles { directory: PathBuf, prefix: String },
}

/// A wrapper around a child process that terminates it and flushes its log files when dropped.
#[derive(Debug)]
pub struct Process {
    child: Child,
    stdout_logs_file: Option<File>,
    stderr_logs_file: Option<File>,
}

impl Process {
    /// The time a process is given to exit after it was asked to when it's dropped.
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

    const EXIT_POLLING_INTERVAL: Duration = Duration::from_millis(10);

    pub fn spawn(
        binary_path: impl AsRef<Path>,
        arguments: impl IntoIterator<Item = impl AsRef<OsStr>>,
        output_behavior: &OutputBehavior,
    ) -> Result<Self> {
        let mut command = Command::new(binary_path.as_ref());
        command.args(arguments).stdin(Stdio::null());

        let (stdout_logs_file, stderr_logs_file) = match output_behavior {
            OutputBehavior::Suppress => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
                (None, None)
            }
            OutputBehavior::Inherit => {
                command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
                (None, None)
            }
            OutputBehavior::LogFiles { directory, prefix } => {
                create_dir_all(directory).context("Failed to create the logs directory")?;
                let stdout_logs_file =
                    Self::open_logs_file(&directory.join(format!("{prefix}_stdout.log")))
                        .context("Failed to open the stdout logs file")?;
                let stderr_logs_file =
                    Self::open_logs_file(&directory.join(format!("{prefix}_stderr.log")))
                        .context("Failed to open the stderr logs file")?;

                command
                    .stdout(
                        stdout_logs_file
                            .try_clone()
                            .context("Failed to clone the stdout logs file")?,
                    )
                    .stderr(
                        stderr_logs_file
                            .try_clone()
                            .context("Failed to clone the stderr logs file")?,
                    );
                (Some(stdout_logs_file), Some(stderr_logs_file))
            }
        };

        let child = command
            .spawn()
            .context("Failed to spawn the built command")?;

        Ok(Self {
            child,
            stdout_logs_file,
            stderr_logs_file,
        })
    }

    fn open_logs_file(path: &Path) -> io::Result<File> {
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(path)
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Returns the exit status if the process already exited, without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        self.child
            .try_wait()
            .context("Failed to query the status of the process")
    }

    /// Asks the process to exit and waits up to `grace_period` for it to do so before killing
    /// it. The process is reaped in both cases.
    pub fn terminate(&mut self, grace_period: Duration) -> Result<ExitStatus> {
        if let Some(status) = self.try_wait()? {
            return Ok(status);
        }

        self.request_termination()
            .context("Failed to ask the process to terminate")?;

        let outcome = poll_blocking(grace_period, Self::EXIT_POLLING_INTERVAL, || {
            self.try_wait().map(|status| match status {
                Some(status) => ControlFlow::Break(status),
                None => ControlFlow::Continue(()),
            })
        })?;

        match outcome {
            PollingOutcome::Completed { output, .. } => Ok(output),
            PollingOutcome::TimedOut { elapsed, .. } => {
                debug!(
                    pid = self.child.id(),
                    ?elapsed,
                    "The process ignored the termination request, killing it"
                );
                self.child.kill().context("Failed to kill the process")?;
                self.child
                    .wait()
                    .context("Failed to wait for the killed process")
            }
        }
    }

    /// Must only be called while the child hasn't been reaped, so that its pid can't have been
    /// reused by an unrelated process.
    #[cfg(unix)]
    fn request_termination(&mut self) -> io::Result<()> {
        send_sigterm(self.child.id())
    }

    #[cfg(not(unix))]
    fn request_termination(&mut self) -> io::Result<()> {
        self.child.kill()
    }
}

/// Sends `SIGTERM` to the process with the given id.
#[cfg(unix)]
fn send_sigterm(pid: u32) -> io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::other("the process id doesn't fit in a pid_t"))?;
    // SAFETY: `kill` takes no pointers and has no memory safety requirements.
    match unsafe { libc::kill(pid, libc::SIGTERM) } {
        0 => Ok(()),
        _ => Err(io::Error::last_os_error()),
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        if let Err(error) = self.terminate(Self::DEFAULT_GRACE_PERIOD) {
            debug!(?error, pid = self.child.id(), "Failed to terminate the process");
        }
        for logs_file in [&mut self.stdout_logs_file, &mut self.stderr_logs_file]
            .into_iter()
            .flatten()
        {
            let _ = logs_file.flush();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::{fs::read_to_string, time::Instant};

    use temp_dir::TempDir;

    use super::*;

    #[test]
    fn terminate_stops_a_running_process() {
        // Arrange
        let mut process = Process::spawn("sleep", ["30"], &OutputBehavior::Suppress)
            .expect("Failed to spawn sleep");
        let start = Instant::now();

        // Act
        let status = process.terminate(Duration::from_secs(5));

        // Assert
        let status = status.expect("Failed to terminate");
        assert!(!status.success());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn terminate_asks_the_process_to_exit_with_sigterm() {
        // Arrange
        use std::os::unix::process::ExitStatusExt;

        let mut process = Process::spawn("sleep", ["30"], &OutputBehavior::Suppress)
            .expect("Failed to spawn sleep");

        // Act
        let status = process.terminate(Duration::from_secs(5));

        // Assert
        assert_eq!(status.expect("Failed to terminate").signal(), Some(libc::SIGTERM));
    }

    #[test]
    fn terminating_twice_returns_the_same_status() {
        // Arrange
        let mut process = Process::spawn("sleep", ["30"], &OutputBehavior::Suppress)
            .expect("Failed to spawn sleep");

        // Act
        let first = process.terminate(Duration::from_secs(5));
        let second = process.terminate(Duration::from_secs(5));

        // Assert
        assert_eq!(
            first.expect("Failed to terminate").code(),
            second.expect("Failed to terminate").code()
        );
    }

    #[test]
    fn processes_ignoring_the_request_are_killed_after_the_grace_period() {
        // Arrange
        let mut process = Process::spawn(
            "sh",
            ["-c", "trap '' TERM; exec sleep 30"],
            &OutputBehavior::Suppress,
        )
        .expect("Failed to spawn sh");
        std::thread::sleep(Duration::from_millis(200));
        let start = Instant::now();

        // Act
        let status = process.terminate(Duration::from_millis(200));

        // Assert
        assert!(status.is_ok());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn output_is_written_to_the_log_files() {
        // Arrange
        let logs_directory = TempDir::new().expect("Failed to create a temp dir");
        let output_behavior = OutputBehavior::LogFiles {
            directory: logs_directory.path().join("logs"),
            prefix: "echo".into(),
        };

        // Act
        let mut process =
            Process::spawn("echo", ["hello"], &output_behavior).expect("Failed to spawn echo");
        let status = process.child.wait();
        drop(process);

        // Assert
        assert!(status.expect("Failed to wait for echo").success());
        let stdout = read_to_string(logs_directory.path().join("logs").join("echo_stdout.log"))
            .expect("Failed to read the stdout logs");
        assert_eq!(stdout, "hello\n");
    }

    #[test]
    fn missing_binaries_fail_to_spawn() {
        let process = Process::spawn(
            "./this-binary-does-not-exist",
            Vec::<String>::new(),
            &OutputBehavior::Suppress,
        );
        assert!(process.is_err());
    }
}
