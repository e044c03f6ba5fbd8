use crate::router::{FeedKey, FeedRouter, RouterError};
use std::time::Duration;
use tbot_core::BarUpdate;
use tbot_queues::{Pollable, Poller, UpdateQueue};
use tracing::warn;

/// A live bar stream bound to the feed it updates.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub key: FeedKey,
    pub queue: UpdateQueue<BarUpdate>,
}

impl Subscription {
    pub fn new(key: FeedKey) -> Self {
        let queue = UpdateQueue::new(key.to_string());
        Self { key, queue }
    }
}

impl FeedRouter {
    /// Wait up to `timeout` for any subscription to deliver, then route every
    /// queued candle from the ready ones. Returns the number of candles routed.
    ///
    /// A source error item stops the pump and is returned; items queued behind
    /// it stay queued for the next call.
    pub fn pump(&mut self, subscriptions: &[Subscription], timeout: Option<Duration>) -> Result<usize, RouterError> {
        let set: Vec<&dyn Pollable> = subscriptions.iter().map(|s| &s.queue as &dyn Pollable).collect();
        let ready = Poller::poll(&set, timeout)?;

        let mut routed = 0;
        for i in ready {
            let sub = &subscriptions[i];
            while let Some(item) = sub.queue.get() {
                let candle = item.map_err(|source| {
                    warn!(feed = %sub.key, error = %source, "Source reported an error");
                    RouterError::Source {
                        key: sub.key.clone(),
                        source,
                    }
                })?;
                self.update(&sub.key, candle)?;
                routed += 1;
            }
        }
        Ok(routed)
    }
}
