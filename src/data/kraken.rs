use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::frame::OhlcvFrame;
use super::OhlcvSource;
use crate::errors::{Error, Result};
use crate::models::Bar;

pub const KRAKEN_API: &str = "https://api.kraken.com";
const OHLC_PATH: &str = "/0/public/OHLC";
const LAST_KEY: &str = "last";

/// Candle granularities served by the OHLC endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
    Week1,
    Day15,
}

impl Interval {
    pub fn minutes(self) -> u32 {
        match self {
            Interval::Minute1 => 1,
            Interval::Minute5 => 5,
            Interval::Minute15 => 15,
            Interval::Minute30 => 30,
            Interval::Hour1 => 60,
            Interval::Hour4 => 240,
            Interval::Day1 => 1440,
            Interval::Week1 => 10080,
            Interval::Day15 => 21600,
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            1 => Some(Interval::Minute1),
            5 => Some(Interval::Minute5),
            15 => Some(Interval::Minute15),
            30 => Some(Interval::Minute30),
            60 => Some(Interval::Hour1),
            240 => Some(Interval::Hour4),
            1440 => Some(Interval::Day1),
            10080 => Some(Interval::Week1),
            21600 => Some(Interval::Day15),
            _ => None,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.minutes())
    }
}

/// Accepts `15m`, `4h`, `1d`, `1w` or a bare minute count.
impl FromStr for Interval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInterval(s.to_string());
        let s = s.trim();
        let (number, unit) = match s.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
            Some((idx, _)) => s.split_at(idx),
            None => (s, "m"),
        };
        let value = u32::from_str(number).map_err(|_| invalid())?;
        let factor = match unit {
            "m" => 1,
            "h" => 60,
            "d" => 1440,
            "w" => 10080,
            _ => return Err(invalid()),
        };
        value
            .checked_mul(factor)
            .and_then(Interval::from_minutes)
            .ok_or_else(invalid)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcRequest {
    pub pair: String,
    pub interval: Interval,
    pub since: Option<u64>,
}

impl OhlcRequest {
    pub fn new(pair: impl Into<String>, interval: Interval) -> Self {
        Self {
            pair: pair.into(),
            interval,
            since: None,
        }
    }

    pub fn since(mut self, since: u64) -> Self {
        self.since = Some(since);
        self
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("pair", self.pair.clone()),
            ("interval", self.interval.minutes().to_string()),
        ];
        if let Some(since) = self.since {
            params.push(("since", since.to_string()));
        }
        params
    }
}

/// One response worth of bars plus the cursor to request the next page with.
#[derive(Debug, Clone)]
pub struct OhlcPage {
    pub frame: OhlcvFrame,
    pub last: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct OhlcResponse {
    #[serde(default)]
    error: Vec<String>,
    result: Option<Value>,
}

/// `[time, open, high, low, close, vwap, volume, count]`
type OhlcRow = (i64, String, String, String, String, String, String, u64);

fn parse_price(field: &str, raw: &str) -> Result<f64> {
    f64::from_str(raw)
        .map_err(|e| Error::MalformedResponse(format!("{} value {:?}: {}", field, raw, e)))
}

/// Parses an OHLC response body. Upstream errors fail without a frame.
pub fn parse_ohlc_response(body: &str) -> Result<OhlcPage> {
    let response: OhlcResponse =
        serde_json::from_str(body).map_err(|e| Error::JsonParse(e.to_string()))?;

    if !response.error.is_empty() {
        warn!("Kraken returned errors: {:?}", response.error);
        return Err(Error::UpstreamApi(response.error));
    }

    let result: Map<String, Value> = match response.result {
        Some(Value::Object(result)) => result,
        Some(other) => {
            return Err(Error::MalformedResponse(format!(
                "result is not an object: {}",
                other
            )))
        }
        None => return Err(Error::MalformedResponse("missing result".to_string())),
    };

    let (pair, rows) = result
        .iter()
        .find(|(key, _)| key.as_str() != LAST_KEY)
        .ok_or_else(|| Error::MalformedResponse("result holds no pair".to_string()))?;

    let mut rows: Vec<OhlcRow> =
        serde_json::from_value(rows.clone()).map_err(|e| Error::JsonParse(e.to_string()))?;
    rows.sort_by_key(|row| row.0);

    let mut bars = Vec::with_capacity(rows.len());
    let mut vwap = Vec::with_capacity(rows.len());
    let mut count = Vec::with_capacity(rows.len());
    for (time, open, high, low, close, row_vwap, volume, row_count) in &rows {
        let timestamp = DateTime::<Utc>::from_timestamp(*time, 0)
            .ok_or_else(|| Error::MalformedResponse(format!("time {} out of range", time)))?;
        bars.push(Bar::new(
            timestamp,
            parse_price("open", open)?,
            parse_price("high", high)?,
            parse_price("low", low)?,
            parse_price("close", close)?,
            parse_price("volume", volume)?,
        ));
        vwap.push(Some(parse_price("vwap", row_vwap)?));
        count.push(Some(*row_count as f64));
    }

    let frame = OhlcvFrame::from_bars(&bars)?.with_many(vec![("vwap", vwap), ("count", count)])?;
    let last = result.get(LAST_KEY).and_then(Value::as_u64);
    debug!("Parsed {} bars for {}, last cursor {:?}", bars.len(), pair, last);

    Ok(OhlcPage { frame, last })
}

#[derive(Debug, Clone)]
pub struct KrakenClient {
    client: Client,
    base_url: String,
}

impl KrakenClient {
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::GenericRequest(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| KRAKEN_API.to_string()),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::GenericRequest(e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| Error::GenericRequest(e.to_string()))
    }

    pub async fn fetch_page(&self, request: &OhlcRequest) -> Result<OhlcPage> {
        let body = self.get(OHLC_PATH, &request.query()).await?;
        let page = parse_ohlc_response(&body)?;
        info!(
            "Fetched {} {} bars for {}",
            page.frame.len(),
            request.interval,
            request.pair
        );
        Ok(page)
    }

    pub async fn fetch_ohlcv(&self, request: &OhlcRequest) -> Result<OhlcvFrame> {
        Ok(self.fetch_page(request).await?.frame)
    }
}

/// OHLCV bars fetched from the Kraken public API.
#[derive(Debug, Clone)]
pub struct KrakenSource {
    client: KrakenClient,
    request: OhlcRequest,
}

impl KrakenSource {
    pub fn new(client: KrakenClient, request: OhlcRequest) -> Self {
        Self { client, request }
    }
}

#[async_trait]
impl OhlcvSource for KrakenSource {
    fn describe(&self) -> String {
        format!("kraken:{}@{}", self.request.pair, self.request.interval)
    }

    async fn load(&self) -> Result<OhlcvFrame> {
        self.client.fetch_ohlcv(&self.request).await
    }
}
