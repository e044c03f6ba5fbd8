use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A one-shot "something is ready" flag shared between the queues of a single
/// poll call and the thread waiting on them.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct ReadySignal {
    inner: Arc<SignalState>,
}

#[derive(Debug, Default)]
struct SignalState {
    flag: Mutex<bool>,
    cond: Condvar,
}

impl ReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake every waiter.
    pub fn set(&self) {
        let mut flag = self.inner.flag.lock();
        *flag = true;
        self.inner.cond.notify_all();
    }

    pub fn is_set(&self) -> bool {
        *self.inner.flag.lock()
    }

    /// Block until the flag is raised or `timeout` elapses. `None` waits forever.
    ///
    /// Returns the state of the flag when the wait ended.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut flag = self.inner.flag.lock();
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

        while !*flag {
            match deadline {
                Some(deadline) => {
                    if self.inner.cond.wait_until(&mut flag, deadline).timed_out() {
                        break;
                    }
                }
                None => self.inner.cond.wait(&mut flag),
            }
        }
        *flag
    }
}
