use crate::queue::Pollable;
use crate::signal::ReadySignal;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Errors that can occur while polling.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Waits on a set of [`Pollable`] queues.
///
/// Only one poller may wait on a given queue at a time: registering a new ready
/// signal replaces whatever the previous poll installed.
pub struct Poller;

impl Poller {
    /// Return the indices (into `queues`) of every ready queue.
    ///
    /// If any queue is already ready this returns at once. Otherwise it blocks
    /// until one of them signals or `timeout` elapses (`None` waits forever),
    /// then reports whichever queues are ready, possibly none.
    pub fn poll(
        queues: &[&dyn Pollable],
        timeout: Option<Duration>,
    ) -> Result<Vec<usize>, PollError> {
        ensure_distinct(queues)?;
        if queues.is_empty() {
            return Ok(Vec::new());
        }

        let ready = ready_indices(queues);
        if !ready.is_empty() {
            return Ok(ready);
        }

        let signal = ReadySignal::new();
        for q in queues {
            q.set_ready_signal(signal.clone());
        }

        // An item may have landed between the first check and registration.
        let ready = ready_indices(queues);
        if !ready.is_empty() {
            return Ok(ready);
        }

        trace!(queues = queues.len(), ?timeout, "Waiting on pollable queues");
        signal.wait(timeout);
        Ok(ready_indices(queues))
    }

    /// Wait until every queue has been ready at least once.
    ///
    /// Returns `false` if `timeout` runs out first, or straight away for an
    /// empty set.
    pub fn wait_all(queues: &[&dyn Pollable], timeout: Option<Duration>) -> Result<bool, PollError> {
        ensure_distinct(queues)?;
        if queues.is_empty() {
            return Ok(false);
        }

        let mut done = vec![false; queues.len()];
        let mut remaining = timeout;

        loop {
            let pending: Vec<usize> = (0..queues.len()).filter(|&i| !done[i]).collect();
            let poll_set: Vec<&dyn Pollable> = pending.iter().map(|&i| queues[i]).collect();

            let started = Instant::now();
            let ready = Self::poll(&poll_set, remaining)?;
            let elapsed = started.elapsed();

            for r in ready {
                done[pending[r]] = true;
            }

            if done.iter().all(|&d| d) {
                return Ok(true);
            }

            if let Some(left) = remaining {
                match left.checked_sub(elapsed) {
                    Some(rest) if !rest.is_zero() => remaining = Some(rest),
                    _ => {
                        let missing: Vec<&str> = (0..queues.len())
                            .filter(|&i| !done[i])
                            .map(|i| queues[i].key())
                            .collect();
                        debug!(?missing, "Timed out waiting for all queues");
                        return Ok(false);
                    }
                }
            }
        }
    }
}

fn ready_indices(queues: &[&dyn Pollable]) -> Vec<usize> {
    let ready: Vec<usize> = queues
        .iter()
        .enumerate()
        .filter(|(_, q)| q.is_ready())
        .map(|(i, _)| i)
        .collect();
    for &i in &ready {
        queues[i].mark_reported();
    }
    ready
}

fn ensure_distinct(queues: &[&dyn Pollable]) -> Result<(), PollError> {
    let mut seen = HashSet::with_capacity(queues.len());
    for q in queues {
        if !seen.insert(q.queue_id()) {
            return Err(PollError::InvalidArgument(format!(
                "queue '{}' appears more than once in the poll set",
                q.key()
            )));
        }
    }
    Ok(())
}
