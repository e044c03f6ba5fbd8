use std::collections::HashMap;
use std::fmt;
use tbot_core::{Candle, CandleSeries, Period, SeriesError, SourceError};
use tbot_queues::PollError;
use tracing::{debug, trace};
use uuid::Uuid;

/// Identifies one feed: a symbol at a candle period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedKey {
    pub symbol: String,
    pub period: Period,
}

impl FeedKey {
    pub fn new(symbol: impl Into<String>, period: Period) -> Self {
        Self {
            symbol: symbol.into(),
            period,
        }
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.symbol, self.period)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur while routing updates.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Feed {0} already exists")]
    DuplicateFeed(FeedKey),
    #[error("Unknown feed {0}")]
    UnknownFeed(FeedKey),
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error("Source error on {key}: {source}")]
    Source {
        key: FeedKey,
        #[source]
        source: SourceError,
    },
}

/// Called after a feed's series changes.
pub trait FeedListener: Send {
    fn on_update(&mut self, key: &FeedKey, series: &CandleSeries);
}

impl<F> FeedListener for F
where
    F: FnMut(&FeedKey, &CandleSeries) + Send,
{
    fn on_update(&mut self, key: &FeedKey, series: &CandleSeries) {
        self(key, series)
    }
}

struct ListenerEntry {
    id: ListenerId,
    key: FeedKey,
    listener: Box<dyn FeedListener>,
}

/// Owns one [`CandleSeries`] per feed and fans updates out to listeners.
///
/// Listeners for a key are notified in registration order after every
/// successful update of that feed. A listener may be registered before its
/// feed exists.
#[derive(Default)]
pub struct FeedRouter {
    feeds: HashMap<FeedKey, CandleSeries>,
    listeners: Vec<ListenerEntry>,
}

impl FeedRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `series` for `symbol`. Listeners already waiting on the
    /// key are notified with the initial contents.
    pub fn add_feed(&mut self, symbol: impl Into<String>, series: CandleSeries) -> Result<FeedKey, RouterError> {
        let key = FeedKey::new(symbol, series.period());
        if self.feeds.contains_key(&key) {
            return Err(RouterError::DuplicateFeed(key));
        }

        debug!(feed = %key, candles = series.len(), "Added feed");
        self.feeds.insert(key.clone(), series);
        self.notify(&key);
        Ok(key)
    }

    pub fn remove_feed(&mut self, key: &FeedKey) -> Option<CandleSeries> {
        let removed = self.feeds.remove(key);
        if removed.is_some() {
            debug!(feed = %key, "Removed feed");
        }
        removed
    }

    /// Append `candle` to the feed's series and notify its listeners. On
    /// failure nothing changes and nobody is notified.
    pub fn update(&mut self, key: &FeedKey, candle: Candle) -> Result<(), RouterError> {
        let series = self
            .feeds
            .get_mut(key)
            .ok_or_else(|| RouterError::UnknownFeed(key.clone()))?;
        series.append(candle)?;
        trace!(feed = %key, len = series.len(), "Routed candle");
        self.notify(key);
        Ok(())
    }

    pub fn series(&self, key: &FeedKey) -> Option<&CandleSeries> {
        self.feeds.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FeedKey> {
        self.feeds.keys()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn add_listener<L>(&mut self, key: FeedKey, listener: L) -> ListenerId
    where
        L: FeedListener + 'static,
    {
        let id = ListenerId(Uuid::new_v4());
        debug!(feed = %key, listener = %id, "Added listener");
        self.listeners.push(ListenerEntry {
            id,
            key,
            listener: Box::new(listener),
        });
        id
    }

    /// Returns `false` if no listener had this id.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, key: &FeedKey) {
        let Some(series) = self.feeds.get(key) else {
            return;
        };
        for entry in self.listeners.iter_mut().filter(|e| &e.key == key) {
            entry.listener.on_update(key, series);
        }
    }
}

impl fmt::Debug for FeedRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedRouter")
            .field("feeds", &self.feeds.keys().collect::<Vec<_>>())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{candle, series};
    use std::sync::{Arc, Mutex};

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> impl FnMut(&FeedKey, &CandleSeries) + Send {
        let log = Arc::clone(log);
        move |key, series| log.lock().unwrap().push(format!("{tag}:{key}:{}", series.len()))
    }

    #[test]
    fn test_feed_key_display() {
        assert_eq!(FeedKey::new("EURUSD", Period::Min5).to_string(), "EURUSD_5m");
    }

    #[test]
    fn test_duplicate_feed_rejected() {
        let mut router = FeedRouter::new();
        router.add_feed("ES", series(&[1, 2])).unwrap();
        assert!(matches!(
            router.add_feed("ES", series(&[3])),
            Err(RouterError::DuplicateFeed(_))
        ));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_update_unknown_feed() {
        let mut router = FeedRouter::new();
        let key = FeedKey::new("NQ", Period::Min1);
        assert!(matches!(
            router.update(&key, candle(0, 5)),
            Err(RouterError::UnknownFeed(_))
        ));
    }

    #[test]
    fn test_update_notifies_only_matching_listeners_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = FeedRouter::new();
        let es = router.add_feed("ES", series(&[1, 2])).unwrap();
        let nq = router.add_feed("NQ", series(&[7])).unwrap();
        router.add_listener(es.clone(), recorder(&log, "a"));
        router.add_listener(nq.clone(), recorder(&log, "other"));
        router.add_listener(es.clone(), recorder(&log, "b"));

        router.update(&es, candle(2, 3)).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a:ES_1m:3", "b:ES_1m:3"]);
        assert_eq!(router.series(&es).unwrap().len(), 3);
    }

    #[test]
    fn test_failed_update_notifies_nobody() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = FeedRouter::new();
        let es = router.add_feed("ES", series(&[1, 2, 3])).unwrap();
        router.add_listener(es.clone(), recorder(&log, "a"));

        // Older than the last candle.
        let err = router.update(&es, candle(0, 9)).unwrap_err();
        assert!(matches!(err, RouterError::Series(SeriesError::OutOfOrder { .. })));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(router.series(&es).unwrap().len(), 3);
    }

    #[test]
    fn test_listener_waiting_for_feed_sees_add() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = FeedRouter::new();
        router.add_listener(FeedKey::new("CL", Period::Min1), recorder(&log, "early"));
        router.add_feed("CL", series(&[1])).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["early:CL_1m:1"]);
    }

    #[test]
    fn test_remove_listener_and_feed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = FeedRouter::new();
        let es = router.add_feed("ES", series(&[1])).unwrap();
        let id = router.add_listener(es.clone(), recorder(&log, "a"));
        assert!(router.remove_listener(id));
        assert!(!router.remove_listener(id));

        router.update(&es, candle(1, 2)).unwrap();
        assert!(log.lock().unwrap().is_empty());

        assert_eq!(router.remove_feed(&es).map(|s| s.len()), Some(2));
        assert!(router.remove_feed(&es).is_none());
        assert!(router.is_empty());
    }
}
