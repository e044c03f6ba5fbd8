//! Pollable queues.
//!
//! Broker callbacks run on a background thread and deposit their results into a
//! queue handed over at request time. The consumer thread waits on many such
//! queues at once through [`Poller`].

pub mod completion;
pub mod poller;
pub mod queue;
pub mod signal;
pub mod update;

pub use completion::CompletionQueue;
pub use poller::{PollError, Poller};
pub use queue::{Pollable, PollableQueue, QueueError, QueueId};
pub use signal::ReadySignal;
pub use update::UpdateQueue;
