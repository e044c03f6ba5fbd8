use crate::{csv_loader, DataError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tbot_core::{BarUpdate, BrokerSource, Candle, Period, RequestId, SourceError};
use tbot_queues::{CompletionQueue, UpdateQueue};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Configuration for a [`ReplaySource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Delay between streamed candles, in milliseconds.
    pub interval_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { interval_ms: 100 }
    }
}

type DatasetKey = (String, Period);

/// A [`BrokerSource`] that plays stored candles back.
///
/// A history request hands out the first `count` candles of a dataset and
/// moves that dataset's cursor there; a subscription then streams the
/// remaining candles one per interval. Responses are produced on a dedicated
/// worker thread, like a real broker client's callback thread.
pub struct ReplaySource {
    config: ReplayConfig,
    datasets: HashMap<DatasetKey, Arc<Vec<Candle>>>,
    cursors: HashMap<DatasetKey, usize>,
    next_id: u64,
    worker: Option<Worker>,
}

struct Worker {
    commands: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

enum Command {
    History {
        id: RequestId,
        queue: CompletionQueue<Candle>,
        candles: Vec<Candle>,
    },
    Stream {
        id: RequestId,
        queue: UpdateQueue<BarUpdate>,
        candles: Vec<Candle>,
    },
    Cancel(RequestId),
}

impl ReplaySource {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            datasets: HashMap::new(),
            cursors: HashMap::new(),
            next_id: 1,
            worker: None,
        }
    }

    /// Register (or replace) the candles played back for `symbol` at `period`.
    pub fn insert(&mut self, symbol: impl Into<String>, period: Period, mut candles: Vec<Candle>) {
        candles.sort_by_key(|c| c.time());
        let key = (symbol.into(), period);
        self.cursors.remove(&key);
        self.datasets.insert(key, Arc::new(candles));
    }

    /// Load `<dir>/<symbol>.csv` as the dataset for `symbol` at `period`.
    /// Returns the number of candles loaded.
    pub fn load_symbol(&mut self, dir: &Path, symbol: &str, period: Period) -> Result<usize, DataError> {
        let candles = csv_loader::load_symbol(dir, symbol, period)?;
        let count = candles.len();
        self.insert(symbol, period, candles);
        Ok(count)
    }

    fn dataset(&self, symbol: &str, period: Period) -> Result<(DatasetKey, Arc<Vec<Candle>>), SourceError> {
        let key = (symbol.to_string(), period);
        let data = self
            .datasets
            .get(&key)
            .cloned()
            .ok_or_else(|| SourceError::UnknownInstrument {
                symbol: symbol.to_string(),
                period,
            })?;
        Ok((key, data))
    }

    fn send(&self, command: Command) -> Result<(), SourceError> {
        let worker = self.worker.as_ref().ok_or(SourceError::NotConnected)?;
        worker
            .commands
            .send(command)
            .map_err(|_| SourceError::Disconnected)
    }

    fn next_request_id(&mut self) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        id
    }

    fn shutdown(&mut self) -> Result<(), SourceError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        // Closing the channel ends the worker loop.
        drop(worker.commands);
        worker.handle.join().map_err(|_| {
            SourceError::ConnectionFailed("replay worker panicked".to_string())
        })
    }
}

impl BrokerSource for ReplaySource {
    fn connect(&mut self) -> Result<(), SourceError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| SourceError::ConnectionFailed(format!("Failed to start runtime: {e}")))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let pace = Duration::from_millis(self.config.interval_ms.max(1));

        let handle = thread::Builder::new()
            .name("replay-source".to_string())
            .spawn(move || runtime.block_on(run_worker(rx, pace)))
            .map_err(|e| SourceError::ConnectionFailed(format!("Failed to spawn worker: {e}")))?;

        self.worker = Some(Worker { commands: tx, handle });
        info!(datasets = self.datasets.len(), interval_ms = self.config.interval_ms, "Replay source connected");
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SourceError> {
        let was_connected = self.worker.is_some();
        self.shutdown()?;
        if was_connected {
            info!("Replay source disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.worker.is_some()
    }

    fn request_history(
        &mut self,
        queue: CompletionQueue<Candle>,
        symbol: &str,
        period: Period,
        count: usize,
    ) -> Result<RequestId, SourceError> {
        if !self.is_connected() {
            return Err(SourceError::NotConnected);
        }
        if count == 0 {
            return Err(SourceError::InvalidRequest("history count must be > 0".into()));
        }
        let (key, data) = self.dataset(symbol, period)?;

        let n = count.min(data.len());
        let id = self.next_request_id();
        self.send(Command::History {
            id,
            queue,
            candles: data[..n].to_vec(),
        })?;
        self.cursors.insert(key, n);
        debug!(request = %id, symbol, %period, count = n, "History requested");
        Ok(id)
    }

    fn subscribe_bars(
        &mut self,
        queue: UpdateQueue<BarUpdate>,
        symbol: &str,
        period: Period,
    ) -> Result<RequestId, SourceError> {
        if !self.is_connected() {
            return Err(SourceError::NotConnected);
        }
        let (key, data) = self.dataset(symbol, period)?;

        let start = self.cursors.get(&key).copied().unwrap_or(0).min(data.len());
        let id = self.next_request_id();
        self.send(Command::Stream {
            id,
            queue,
            candles: data[start..].to_vec(),
        })?;
        self.cursors.insert(key, data.len());
        debug!(request = %id, symbol, %period, remaining = data.len() - start, "Bars subscribed");
        Ok(id)
    }

    fn cancel(&mut self, request: RequestId) -> Result<(), SourceError> {
        if request.0 == 0 || request.0 >= self.next_id {
            return Err(SourceError::UnknownRequest(request));
        }
        self.send(Command::Cancel(request))
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Replay worker did not shut down cleanly");
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct ActiveStream {
    task: tokio::task::JoinHandle<()>,
    queue: UpdateQueue<BarUpdate>,
}

async fn run_worker(mut commands: mpsc::UnboundedReceiver<Command>, pace: Duration) {
    let mut streams: HashMap<RequestId, ActiveStream> = HashMap::new();

    while let Some(command) = commands.recv().await {
        streams.retain(|_, s| !s.task.is_finished());

        match command {
            Command::History { id, queue, candles } => {
                let count = candles.len();
                for candle in candles {
                    if let Err(e) = queue.put(candle) {
                        warn!(request = %id, error = %e, "History queue rejected candle");
                        break;
                    }
                }
                queue.complete();
                debug!(request = %id, count, "History delivered");
            }
            Command::Stream { id, queue, candles } => {
                let task = tokio::spawn(stream_bars(id, queue.clone(), candles, pace));
                streams.insert(id, ActiveStream { task, queue });
            }
            Command::Cancel(id) => {
                if let Some(stream) = streams.remove(&id) {
                    stream.task.abort();
                    debug!(request = %id, "Stream cancelled");
                }
            }
        }
    }

    // Tell consumers of unfinished streams that nothing more is coming.
    for (id, stream) in streams {
        if stream.task.is_finished() {
            continue;
        }
        stream.task.abort();
        if stream.queue.put(Err(SourceError::Disconnected)).is_err() {
            warn!(request = %id, "Could not report disconnect on full queue");
        }
    }
}

async fn stream_bars(id: RequestId, queue: UpdateQueue<BarUpdate>, candles: Vec<Candle>, pace: Duration) {
    let total = candles.len();
    let mut ticker = tokio::time::interval(pace);
    for candle in candles {
        ticker.tick().await;
        if let Err(e) = queue.put(Ok(candle)) {
            warn!(request = %id, error = %e, "Stream queue rejected candle");
            return;
        }
    }
    debug!(request = %id, total, "Stream exhausted");
}
