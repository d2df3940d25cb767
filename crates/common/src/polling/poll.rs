use std::{
    ops::ControlFlow,
    time::{Duration, Instant},
};

/// Polls a fallible operation on the current thread until it breaks, errors, or the polling
/// duration runs out.
///
/// The operation returns a [`Result<ControlFlow<O, ()>>`]. A [`ControlFlow::Break`] completes the
/// poll with its output, an [`Err`] is returned to the caller right away, and a
/// [`ControlFlow::Continue`] makes the function sleep for `wait_duration` before trying again.
///
/// Every sleep is clamped to the time that is left, so a poll that times out returns no later
/// than one wait period (plus the duration of a single attempt) after the deadline.
pub fn poll_blocking<O, E>(
    polling_duration: Duration,
    wait_duration: Duration,
    mut operation: impl FnMut() -> Result<ControlFlow<O, ()>, E>,
) -> Result<PollingOutcome<O>, E> {
    let start = Instant::now();
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        if let ControlFlow::Break(output) = operation()? {
            return Ok(PollingOutcome::Completed { output, attempts });
        }

        let elapsed = start.elapsed();
        if elapsed >= polling_duration {
            return Ok(PollingOutcome::TimedOut { attempts, elapsed });
        }

        std::thread::sleep(wait_duration.min(polling_duration - elapsed));
    }
}

/// The result of [`poll_blocking`] when the operation didn't fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollingOutcome<O> {
    /// The operation broke out of the loop on the given attempt (1-based).
    Completed { output: O, attempts: usize },
    /// The polling duration ran out before the operation broke out of the loop.
    TimedOut { attempts: usize, elapsed: Duration },
}
