use crate::signal::ReadySignal;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Errors that can occur when enqueueing.
#[derive(Debug, thiserror::Error)]
pub enum QueueError<T> {
    /// The queue is bounded and at capacity. The rejected item is handed back.
    #[error("Queue '{key}' is full ({capacity} items)")]
    Full { key: String, capacity: usize, item: T },
}

/// Identity of a queue, shared by every handle cloned from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueId(usize);

/// Anything the [`Poller`](crate::Poller) can wait on.
pub trait Pollable: Send + Sync {
    /// Caller-assigned label, used in logs.
    fn key(&self) -> &str;

    /// Number of queued items, observed without consuming any.
    fn size(&self) -> usize;

    /// Whether a poll should report this queue.
    fn is_ready(&self) -> bool {
        self.size() > 0
    }

    /// Install the signal raised when this queue becomes ready, replacing any
    /// previously registered one.
    fn set_ready_signal(&self, signal: ReadySignal);

    fn queue_id(&self) -> QueueId;

    /// Called by the poller after it reported this queue as ready.
    fn mark_reported(&self) {}
}

/// Thread-safe FIFO with a single registered ready signal.
///
/// This is the base of the queue family: it never raises the signal on its own.
/// [`UpdateQueue`](crate::UpdateQueue) signals on every put and
/// [`CompletionQueue`](crate::CompletionQueue) signals on an explicit
/// `complete()`. Clones share the same buffer, so a producer thread and the
/// consumer each hold their own handle.
pub struct PollableQueue<T> {
    shared: Arc<Shared<T>>,
}

struct Shared<T> {
    key: String,
    /// `None` means unbounded.
    capacity: Option<usize>,
    items: Mutex<VecDeque<T>>,
    signal: Mutex<Option<ReadySignal>>,
    completed: AtomicBool,
    reported: AtomicBool,
}

impl<T> PollableQueue<T> {
    /// Create an unbounded queue.
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_capacity(key, None)
    }

    /// Create a queue holding at most `capacity` items. A capacity of 0 means
    /// unbounded.
    pub fn bounded(key: impl Into<String>, capacity: usize) -> Self {
        Self::with_capacity(key, (capacity > 0).then_some(capacity))
    }

    fn with_capacity(key: impl Into<String>, capacity: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Shared {
                key: key.into(),
                capacity,
                items: Mutex::new(VecDeque::new()),
                signal: Mutex::new(None),
                completed: AtomicBool::new(false),
                reported: AtomicBool::new(false),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    pub fn capacity(&self) -> Option<usize> {
        self.shared.capacity
    }

    pub fn size(&self) -> usize {
        self.shared.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Enqueue without signalling.
    pub fn put(&self, item: T) -> Result<(), QueueError<T>> {
        let mut items = self.shared.items.lock();
        if let Some(capacity) = self.shared.capacity {
            if items.len() >= capacity {
                return Err(QueueError::Full {
                    key: self.shared.key.clone(),
                    capacity,
                    item,
                });
            }
        }
        items.push_back(item);
        Ok(())
    }

    /// Take the oldest item, if any. Never blocks.
    pub fn get(&self) -> Option<T> {
        self.shared.items.lock().pop_front()
    }

    /// Take every queued item in FIFO order.
    pub fn drain(&self) -> Vec<T> {
        self.shared.items.lock().drain(..).collect()
    }

    pub fn set_ready_signal(&self, signal: ReadySignal) {
        *self.shared.signal.lock() = Some(signal);
    }

    pub fn id(&self) -> QueueId {
        QueueId(Arc::as_ptr(&self.shared) as *const () as usize)
    }

    /// Raise the registered signal, if there is one.
    pub(crate) fn notify(&self) {
        if let Some(signal) = self.shared.signal.lock().as_ref() {
            signal.set();
        }
    }

    pub(crate) fn mark_completed(&self) {
        self.shared.completed.store(true, Ordering::Release);
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.shared.completed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_reported(&self) {
        self.shared.reported.store(true, Ordering::Release);
    }

    pub(crate) fn is_reported(&self) -> bool {
        self.shared.reported.load(Ordering::Acquire)
    }
}

impl<T> Clone for PollableQueue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for PollableQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollableQueue")
            .field("key", &self.shared.key)
            .field("capacity", &self.shared.capacity)
            .field("size", &self.size())
            .finish()
    }
}

impl<T: Send> Pollable for PollableQueue<T> {
    fn key(&self) -> &str {
        PollableQueue::key(self)
    }

    fn size(&self) -> usize {
        PollableQueue::size(self)
    }

    fn set_ready_signal(&self, signal: ReadySignal) {
        PollableQueue::set_ready_signal(self, signal)
    }

    fn queue_id(&self) -> QueueId {
        self.id()
    }
}
