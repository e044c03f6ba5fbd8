use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tbot_core::Period;
use tbot_data::ReplayConfig;

/// Settings for the `scan` command, read from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory holding one `<SYMBOL>.csv` per feed.
    pub data_dir: PathBuf,
    /// Candles kept per series.
    pub capacity: usize,
    /// Candles requested as backfill before streaming starts.
    pub history_bars: usize,
    pub replay: ReplayConfig,
    /// Longest single wait on the stream queues.
    pub poll_timeout_ms: u64,
    /// Give up once no candle has arrived for this long.
    pub idle_timeout_ms: u64,
    pub feeds: Vec<FeedConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub symbol: String,
    pub period: Period,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            capacity: 500,
            history_bars: 200,
            replay: ReplayConfig::default(),
            poll_timeout_ms: 1_000,
            idle_timeout_ms: 5_000,
            feeds: Vec::new(),
        }
    }
}

impl ScanConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity < 2 {
            bail!("capacity must be at least 2");
        }
        if self.history_bars == 0 {
            bail!("history_bars must be > 0");
        }
        for (i, feed) in self.feeds.iter().enumerate() {
            if self.feeds[..i].contains(feed) {
                bail!("feed {} {} is listed twice", feed.symbol, feed.period);
            }
        }
        Ok(())
    }
}
