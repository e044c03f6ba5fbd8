use crate::queue::{Pollable, PollableQueue, QueueError, QueueId};
use crate::signal::ReadySignal;

/// Queue that stays quiet while items arrive and signals once the producer
/// calls [`complete`](CompletionQueue::complete).
///
/// Suited to "stream many items, then say done" responses such as a historical
/// bar backfill. Items put before `complete()` do not make the queue ready, so
/// a poller never sees a partial response. A completed queue counts as ready
/// even when it received no items, but only until a poll has reported it once;
/// after that it is ready only while it still holds items.
#[derive(Debug)]
pub struct CompletionQueue<T> {
    inner: PollableQueue<T>,
}

impl<T> CompletionQueue<T> {
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

    /// Enqueue without signalling.
    pub fn put(&self, item: T) -> Result<(), QueueError<T>> {
        self.inner.put(item)
    }

    /// Mark the response as finished and raise the registered ready signal.
    pub fn complete(&self) {
        self.inner.mark_completed();
        self.inner.notify();
    }

    pub fn is_completed(&self) -> bool {
        self.inner.is_completed()
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

impl<T> Clone for CompletionQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send> Pollable for CompletionQueue<T> {
    fn key(&self) -> &str {
        self.inner.key()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn is_ready(&self) -> bool {
        self.inner.is_completed() && (self.inner.size() > 0 || !self.inner.is_reported())
    }

    fn set_ready_signal(&self, signal: ReadySignal) {
        self.inner.set_ready_signal(signal)
    }

    fn queue_id(&self) -> QueueId {
        self.inner.id()
    }

    fn mark_reported(&self) {
        self.inner.mark_reported()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_does_not_signal_until_complete() {
        let q = CompletionQueue::new("history");
        let signal = ReadySignal::new();
        q.set_ready_signal(signal.clone());

        for i in 0..10 {
            q.put(i).unwrap();
        }
        assert!(!signal.is_set());
        assert!(!q.is_completed());

        q.complete();
        assert!(signal.is_set());
        assert!(q.is_completed());
        assert_eq!(q.drain().len(), 10);
    }

    #[test]
    fn test_empty_completed_queue_is_ready() {
        let q = CompletionQueue::<u32>::new("empty-history");
        assert!(!q.is_ready());
        q.complete();
        assert!(q.is_ready());
        assert_eq!(q.size(), 0);
    }

    #[test]
    fn test_items_without_complete_are_not_ready() {
        let q = CompletionQueue::new("partial");
        q.put(1).unwrap();
        assert!(!q.is_ready());
        q.complete();
        assert!(q.is_ready());
    }

    #[test]
    fn test_reported_empty_completion_is_no_longer_ready() {
        let q = CompletionQueue::<u32>::new("seen");
        q.complete();
        q.mark_reported();
        assert!(!q.is_ready());
        assert!(q.is_completed());
    }
}
