use crate::queue::{Pollable, PollableQueue, QueueError, QueueId};
use crate::signal::ReadySignal;

/// Queue that wakes the poller on every enqueued item.
///
/// Use it when each delivered item should be processed on its own, e.g. a
/// real-time bar stream.
#[derive(Debug)]
pub struct UpdateQueue<T> {
    inner: PollableQueue<T>,
}

impl<T> UpdateQueue<T> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            inner: PollableQueue::new(key),
        }
    }

    pub fn bounded(key: impl Into<String>, capacity: usize) -> Self {
        Self {
            inner: PollableQueue::bounded(key, capacity),
        }
    }

    /// Enqueue and raise the registered ready signal.
    pub fn put(&self, item: T) -> Result<(), QueueError<T>> {
        self.inner.put(item)?;
        self.inner.notify();
        Ok(())
    }

    pub fn get(&self) -> Option<T> {
        self.inner.get()
    }

    pub fn drain(&self) -> Vec<T> {
        self.inner.drain()
    }

    pub fn key(&self) -> &str {
        self.inner.key()
    }

    pub fn size(&self) -> usize {
        self.inner.size()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<T> Clone for UpdateQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send> Pollable for UpdateQueue<T> {
    fn key(&self) -> &str {
        self.inner.key()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn set_ready_signal(&self, signal: ReadySignal) {
        self.inner.set_ready_signal(signal)
    }

    fn queue_id(&self) -> QueueId {
        self.inner.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_raises_registered_signal() {
        let q = UpdateQueue::new("ticks");
        let signal = ReadySignal::new();
        q.set_ready_signal(signal.clone());
        assert!(!signal.is_set());

        q.put(1).unwrap();
        assert!(signal.is_set());
        assert_eq!(q.get(), Some(1));
    }

    #[test]
    fn test_put_without_signal_is_fine() {
        let q = UpdateQueue::new("nobody-waiting");
        q.put("x").unwrap();
        assert_eq!(q.size(), 1);
    }

    #[test]
    fn test_rejected_put_does_not_signal() {
        let q = UpdateQueue::bounded("tight", 1);
        q.put(1).unwrap();
        let signal = ReadySignal::new();
        q.set_ready_signal(signal.clone());
        assert!(q.put(2).is_err());
        assert!(!signal.is_set());
    }
}
