use async_trait::async_trait;

use crate::errors::Result;

pub mod csv;
pub mod frame;
pub mod kraken;

pub use self::csv::{read_csv_bytes, read_csv_path, CsvSource};
pub use frame::OhlcvFrame;
pub use kraken::{parse_ohlc_response, Interval, KrakenClient, KrakenSource, OhlcPage, OhlcRequest};

/// Anything that can produce an ordered OHLCV frame.
#[async_trait]
pub trait OhlcvSource: Send + Sync {
    fn describe(&self) -> String;
    async fn load(&self) -> Result<OhlcvFrame>;
}
