pub mod csv_loader;
pub mod replay;

pub use csv_loader::{load_candles_from_csv, load_candles_from_reader, load_symbol};
pub use replay::{ReplayConfig, ReplaySource};

/// Errors that can occur while loading candle data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
