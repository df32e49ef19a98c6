use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use crate::data::{CsvSource, Interval, KrakenClient, KrakenSource, OhlcRequest, OhlcvSource};
use crate::indicators::EmaWeighting;
use crate::models::ParameterSet;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// OHLCV CSV file with at least `close` and `volume` columns
    #[arg(long, conflicts_with = "pair")]
    pub csv: Option<PathBuf>,

    /// Kraken pair to fetch, e.g. XBTUSD
    #[arg(long, required_unless_present = "csv")]
    pub pair: Option<String>,

    #[arg(short, long, value_parser = parse_interval, default_value = "1m")]
    pub interval: Interval,

    /// Kraken `since` cursor (unix seconds)
    #[arg(long)]
    pub since: Option<u64>,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, default_value_t = 50)]
    pub ema: usize,

    #[arg(long, default_value_t = 14)]
    pub rsi: usize,

    #[arg(long, default_value_t = 10)]
    pub fast: usize,

    #[arg(long, default_value_t = 50)]
    pub slow: usize,

    /// Use bias-adjusted EMA weights instead of seeding from the first close
    #[arg(long)]
    pub bias_adjusted: bool,

    /// Add returns, SMA 20/50/200 and 20-bar volatility columns
    #[arg(long)]
    pub research: bool,

    /// Rows printed from the end of the enriched table
    #[arg(short, long, default_value_t = 10)]
    pub rows: usize,
}

impl Args {
    pub fn parameter_set(&self) -> ParameterSet {
        let weighting = if self.bias_adjusted {
            EmaWeighting::BiasAdjusted
        } else {
            EmaWeighting::Recursive
        };
        ParameterSet::new(self.ema, self.rsi, self.fast, self.slow).with_ema_weighting(weighting)
    }

    pub fn source(&self) -> crate::Result<Box<dyn OhlcvSource>> {
        match (&self.csv, &self.pair) {
            (Some(path), _) => Ok(Box::new(CsvSource::new(path.clone()))),
            (None, pair) => {
                let mut request =
                    OhlcRequest::new(pair.clone().unwrap_or_default(), self.interval);
                request.since = self.since;
                Ok(Box::new(KrakenSource::new(
                    KrakenClient::new(self.base_url.clone())?,
                    request,
                )))
            }
        }
    }
}

pub fn parse_interval(s: &str) -> Result<Interval, String> {
    Interval::from_str(s).map_err(|_| {
        "Invalid interval. Use 1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w or 15d.".to_string()
    })
}
