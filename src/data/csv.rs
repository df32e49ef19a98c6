use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, info};
use polars::prelude::*;

use super::frame::{OhlcvFrame, TIMESTAMP};
use super::OhlcvSource;
use crate::errors::{Error, Result};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

fn csv_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .map_parse_options(|options| options.with_try_parse_dates(true))
}

pub fn read_csv_path(path: &Path) -> Result<OhlcvFrame> {
    let frame = csv_options()
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    info!(
        "Loaded {} rows, columns {:?} from {}",
        frame.height(),
        frame.get_column_names(),
        path.display()
    );
    Ok(OhlcvFrame::new(normalize_timestamp(frame)?))
}

/// Reads an uploaded CSV held in memory.
pub fn read_csv_bytes(bytes: Vec<u8>) -> Result<OhlcvFrame> {
    let frame = csv_options()
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    info!("Loaded {} rows from uploaded CSV", frame.height());
    Ok(OhlcvFrame::new(normalize_timestamp(frame)?))
}

/// Brings a `timestamp` column, when present, to `Datetime(ms)`. Integers and
/// floats are seconds since the epoch.
fn normalize_timestamp(mut frame: DataFrame) -> Result<DataFrame> {
    if frame.column(TIMESTAMP).is_err() {
        debug!("No {} column, leaving frame as read", TIMESTAMP);
        return Ok(frame);
    }
    if let Some(normalized) = normalized_timestamp(frame.column(TIMESTAMP)?)? {
        frame.with_column(normalized)?;
    }
    Ok(frame)
}

fn normalized_timestamp(column: &Column) -> Result<Option<Column>> {
    let normalized = match column.dtype() {
        DataType::Datetime(_, _) => return Ok(None),
        DataType::Date => column.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
        DataType::String => {
            let mut millis = Vec::with_capacity(column.len());
            for (row, value) in column.str()?.into_iter().enumerate() {
                let parsed = match value {
                    Some(raw) => Some(
                        parse_timestamp(raw)
                            .ok_or_else(|| Error::InvalidTimestamp {
                                row,
                                value: raw.to_string(),
                            })?
                            .timestamp_millis(),
                    ),
                    None => None,
                };
                millis.push(parsed);
            }
            datetime_column(millis)?
        }
        dt if dt.is_integer() || dt.is_float() => {
            let seconds = column.cast(&DataType::Float64)?;
            let millis: Vec<Option<i64>> = seconds
                .f64()?
                .into_iter()
                .map(|s| s.map(|s| (s * 1000.0).round() as i64))
                .collect();
            datetime_column(millis)?
        }
        other => {
            return Err(Error::InvalidTimestamp {
                row: 0,
                value: format!("column dtype {}", other),
            })
        }
    };
    Ok(Some(normalized))
}

fn datetime_column(millis: Vec<Option<i64>>) -> Result<Column> {
    let series = Series::new(TIMESTAMP.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    Ok(Column::from(series))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return parsed.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}

/// OHLCV bars from a CSV file on disk.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl OhlcvSource for CsvSource {
    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }

    async fn load(&self) -> Result<OhlcvFrame> {
        read_csv_path(&self.path)
    }
}
