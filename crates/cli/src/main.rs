mod config;
mod scanner;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::ScanConfig;
use scanner::{AbcScanner, Signal, SignalKind, SignalLog};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tbot_core::{BrokerSource, Candle, CandleSeries, PatternRecord, Period};
use tbot_data::{load_candles_from_csv, ReplaySource};
use tbot_feed::{FeedKey, FeedRouter, RouterError, Subscription};
use tbot_indicators::GannAnalysis;
use tbot_queues::{CompletionQueue, Pollable, Poller};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const GANN: &str = "gann";

#[derive(Parser)]
#[command(name = "tbot")]
#[command(about = "Gann bar, ABC and UTURN analysis over candle history")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// TOML config file for `scan`
    #[arg(short, long, env = "TBOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run Gann analysis over a CSV file and print one record per candle
    Analyze {
        /// Path to CSV data file
        #[arg(short, long)]
        data: PathBuf,

        /// Candle period of the file (1m, 5m, 1h, 1d, ...)
        #[arg(short, long, default_value = "1d")]
        period: Period,

        /// Keep only the most recent N candles
        #[arg(long)]
        capacity: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Replay configured feeds through the live pipeline and report ABC/UTURN signals
    Scan {
        /// Directory with one <SYMBOL>.csv per feed (overrides the config)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Delay between replayed candles in milliseconds (overrides the config)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Print collected signals as JSON when done
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Analyze {
            data,
            period,
            capacity,
            json,
        } => analyze(&data, period, capacity, json),
        Commands::Scan {
            data_dir,
            interval_ms,
            json,
        } => {
            let mut config = match &cli.config {
                Some(path) => ScanConfig::load(path)?,
                None => ScanConfig::default(),
            };
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(ms) = interval_ms {
                config.replay.interval_ms = ms;
            }
            scan(config, json)
        }
    }
}

#[derive(Serialize)]
struct AnalyzedBar<'a> {
    time: chrono::DateTime<chrono::Utc>,
    high: String,
    low: String,
    #[serde(flatten)]
    record: &'a PatternRecord,
}

fn analyze(data: &Path, period: Period, capacity: Option<usize>, json: bool) -> Result<()> {
    let candles = load_candles_from_csv(data, period)?;
    if candles.is_empty() {
        bail!("No candles loaded from {}", data.display());
    }
    info!(data = %data.display(), %period, candles = candles.len(), "Loaded candles");

    let capacity = capacity.unwrap_or(candles.len()).max(2);
    let series = analyzed_series(period, candles, capacity)?;
    let records = pattern_records(&series)?;

    if json {
        let rows: Vec<AnalyzedBar> = series
            .iter()
            .zip(records.iter().copied())
            .map(|(c, record)| AnalyzedBar {
                time: c.time(),
                high: c.high().to_string(),
                low: c.low().to_string(),
                record,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let sep = "=".repeat(72);
    println!("{sep}");
    println!("  {:<25} {:>12} {:>12}  {:<5} {:<5} {:<5}", "Time", "High", "Low", "Bar", "ABC", "UTURN");
    println!("{sep}");
    for (candle, record) in series.iter().zip(&records) {
        println!(
            "  {:<25} {:>12} {:>12}  {:<5} {:<5} {:<5}",
            candle.time().format("%Y-%m-%d %H:%M:%S").to_string(),
            candle.high().to_string(),
            candle.low().to_string(),
            record.bar_direction.to_string(),
            mark(record.abc),
            mark(record.uturn),
        );
    }
    println!("{sep}");

    let abcs = records.iter().filter(|r| r.abc.is_some()).count();
    let uturns = records.iter().filter(|r| r.uturn.is_some()).count();
    println!("  {} candles, {abcs} ABC, {uturns} UTURN", records.len());
    Ok(())
}

/// Keep the newest `capacity` candles and run Gann analysis over them.
fn analyzed_series(period: Period, candles: Vec<Candle>, capacity: usize) -> Result<CandleSeries> {
    let mut series = CandleSeries::new(period, candles, capacity)?;
    series.register_indicator(GANN, GannAnalysis::new())?;
    Ok(series)
}

fn pattern_records(series: &CandleSeries) -> Result<Vec<&PatternRecord>> {
    Ok(series
        .indicator(GANN)
        .context("Gann analysis missing after registration")?
        .data()
        .iter()
        .filter_map(|v| v.as_pattern())
        .collect())
}

fn mark(direction: Option<tbot_core::Direction>) -> String {
    direction.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

fn scan(config: ScanConfig, json: bool) -> Result<()> {
    if config.feeds.is_empty() {
        bail!("No feeds configured; add [[feeds]] entries to the config file");
    }
    config.validate()?;

    let mut source = ReplaySource::new(config.replay.clone());
    let mut expected_stream = 0usize;
    for feed in &config.feeds {
        let count = source.load_symbol(&config.data_dir, &feed.symbol, feed.period)?;
        expected_stream += count.saturating_sub(config.history_bars);
        info!(symbol = %feed.symbol, period = %feed.period, candles = count, "Loaded replay data");
    }

    let outcome = run_scan(&mut source, &config, expected_stream)?;
    info!(
        feeds = outcome.router.len(),
        routed = outcome.routed,
        signals = outcome.signals.len(),
        "Scan complete"
    );
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.signals)?);
    } else {
        for s in &outcome.signals {
            let kind = match s.kind {
                SignalKind::Abc => "ABC",
                SignalKind::Uturn => "UTURN",
            };
            println!("{}  {:<12} {:<6} {}", s.time.format("%Y-%m-%d %H:%M:%S"), s.feed, kind, s.direction);
        }
    }
    Ok(())
}

struct ScanOutcome {
    router: FeedRouter,
    signals: Vec<Signal>,
    routed: usize,
}

/// Backfill every configured feed from `source`, then stream until
/// `expected_stream` candles were routed or the feeds go idle.
fn run_scan<S: BrokerSource>(source: &mut S, config: &ScanConfig, expected_stream: usize) -> Result<ScanOutcome> {
    source.connect()?;

    let histories: Vec<(FeedKey, CompletionQueue<Candle>)> = config
        .feeds
        .iter()
        .map(|f| {
            let key = FeedKey::new(f.symbol.clone(), f.period);
            let queue = CompletionQueue::new(format!("{key} history"));
            (key, queue)
        })
        .collect();
    for (key, queue) in &histories {
        source.request_history(queue.clone(), &key.symbol, key.period, config.history_bars)?;
    }
    // History queues only become ready once the whole response is in.
    let pending: Vec<&dyn Pollable> = histories.iter().map(|(_, q)| q as &dyn Pollable).collect();
    let backfill_timeout = Duration::from_millis(config.idle_timeout_ms);
    if !Poller::wait_all(&pending, Some(backfill_timeout))? {
        bail!("Timed out waiting for history backfill");
    }

    let signals = SignalLog::default();
    let mut router = FeedRouter::new();
    for (key, queue) in &histories {
        let candles = queue.drain();
        if candles.is_empty() {
            warn!(feed = %key, "No history delivered, skipping feed");
            continue;
        }
        let mut series = CandleSeries::new(key.period, candles, config.capacity)?;
        series.register_indicator(GANN, GannAnalysis::new())?;
        router.add_feed(key.symbol.clone(), series)?;
        router.add_listener(key.clone(), AbcScanner::new(GANN, signals.clone()));
    }

    let mut subscriptions = Vec::new();
    for key in router.keys() {
        let sub = Subscription::new(key.clone());
        source.subscribe_bars(sub.queue.clone(), &key.symbol, key.period)?;
        subscriptions.push(sub);
    }
    info!(feeds = subscriptions.len(), expected = expected_stream, "Streaming");

    let poll_timeout = Duration::from_millis(config.poll_timeout_ms);
    let idle_timeout = Duration::from_millis(config.idle_timeout_ms);
    let mut routed = 0usize;
    let mut last_activity = Instant::now();
    while routed < expected_stream {
        match router.pump(&subscriptions, Some(poll_timeout)) {
            Ok(0) if last_activity.elapsed() >= idle_timeout => {
                warn!(routed, expected = expected_stream, "Stream went idle, stopping");
                break;
            }
            Ok(0) => {}
            Ok(n) => {
                routed += n;
                last_activity = Instant::now();
            }
            Err(RouterError::Source { key, source: err }) => {
                warn!(feed = %key, error = %err, "Stream failed, stopping");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    source.disconnect()?;

    let signals = signals.lock().clone();
    Ok(ScanOutcome {
        router,
        signals,
        routed,
    })
}
