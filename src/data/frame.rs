use chrono::{DateTime, Utc};
use polars::prelude::*;

use crate::errors::{Error, Result};
use crate::models::Bar;

pub const TIMESTAMP: &str = "timestamp";
pub const OPEN: &str = "open";
pub const HIGH: &str = "high";
pub const LOW: &str = "low";
pub const CLOSE: &str = "close";
pub const VOLUME: &str = "volume";

/// An ordered OHLCV table. Every transform borrows a frame and returns a new
/// one; the wrapped `DataFrame` is never mutated in place.
#[derive(Debug, Clone)]
pub struct OhlcvFrame {
    frame: DataFrame,
}

impl OhlcvFrame {
    pub fn new(frame: DataFrame) -> Self {
        Self { frame }
    }

    pub fn from_bars(bars: &[Bar]) -> Result<Self> {
        let timestamps: Vec<i64> = bars.iter().map(|b| b.timestamp.timestamp_millis()).collect();
        let timestamp = Series::new(TIMESTAMP.into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

        let frame = DataFrame::new(vec![
            Column::from(timestamp),
            Column::new(OPEN.into(), bars.iter().map(|b| b.open).collect::<Vec<f64>>()),
            Column::new(HIGH.into(), bars.iter().map(|b| b.high).collect::<Vec<f64>>()),
            Column::new(LOW.into(), bars.iter().map(|b| b.low).collect::<Vec<f64>>()),
            Column::new(CLOSE.into(), bars.iter().map(|b| b.close).collect::<Vec<f64>>()),
            Column::new(VOLUME.into(), bars.iter().map(|b| b.volume).collect::<Vec<f64>>()),
        ])?;

        Ok(Self { frame })
    }

    pub fn len(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    fn require(&self, name: &str) -> Result<&Column> {
        self.frame
            .column(name)
            .map_err(|_| Error::MissingColumn(name.to_string()))
    }

    /// Column `name` read as nullable `f64` values. NaN cells read as `None`.
    pub fn values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let column = self.require(name)?.cast(&DataType::Float64)?;
        Ok(column
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect())
    }

    pub fn close(&self) -> Result<Vec<Option<f64>>> {
        self.values(CLOSE)
    }

    pub fn volume(&self) -> Result<Vec<Option<f64>>> {
        self.values(VOLUME)
    }

    pub fn timestamps(&self) -> Result<Vec<Option<DateTime<Utc>>>> {
        let column = self.require(TIMESTAMP)?;
        let divisor = match column.dtype() {
            DataType::Datetime(TimeUnit::Nanoseconds, _) => 1_000_000,
            DataType::Datetime(TimeUnit::Microseconds, _) => 1_000,
            DataType::Datetime(TimeUnit::Milliseconds, _) => 1,
            other => {
                return Err(Error::InvalidTimestamp {
                    row: 0,
                    value: format!("column dtype {}", other),
                })
            }
        };
        let physical = column.cast(&DataType::Int64)?;
        Ok(physical
            .i64()?
            .into_iter()
            .map(|v| v.and_then(|v| DateTime::from_timestamp_millis(v / divisor)))
            .collect())
    }

    /// Rows with every OHLCV field present, in frame order. Rows holding a
    /// null or NaN field are skipped.
    pub fn bars(&self) -> Result<Vec<Bar>> {
        let timestamps = self.timestamps()?;
        let open = self.values(OPEN)?;
        let high = self.values(HIGH)?;
        let low = self.values(LOW)?;
        let close = self.close()?;
        let volume = self.volume()?;

        Ok((0..self.len())
            .filter_map(|i| {
                Some(Bar::new(
                    timestamps[i]?,
                    open[i]?,
                    high[i]?,
                    low[i]?,
                    close[i]?,
                    volume[i]?,
                ))
            })
            .collect())
    }

    /// A copy of this frame with `column` added, or replaced when a column of
    /// the same name exists.
    pub fn with_column(&self, column: Column) -> Result<Self> {
        let mut frame = self.frame.clone();
        frame.with_column(column)?;
        Ok(Self { frame })
    }

    pub fn with_values(&self, name: &str, values: Vec<Option<f64>>) -> Result<Self> {
        self.with_column(Column::new(name.into(), values))
    }

    pub fn with_many(&self, columns: Vec<(&str, Vec<Option<f64>>)>) -> Result<Self> {
        let mut frame = self.frame.clone();
        for (name, values) in columns {
            frame.with_column(Column::new(name.into(), values))?;
        }
        Ok(Self { frame })
    }

    pub fn tail(&self, rows: usize) -> DataFrame {
        self.frame.tail(Some(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bars() -> Vec<Bar> {
        (0..3)
            .map(|i| {
                let close = 10.0 + i as f64;
                Bar::new(
                    Utc.timestamp_opt(1_700_000_000 + i * 60, 0).unwrap(),
                    close - 0.5,
                    close + 1.0,
                    close - 1.0,
                    close,
                    100.0 * (i + 1) as f64,
                )
            })
            .collect()
    }

    #[test]
    fn test_bars_survive_the_frame() {
        let input = bars();
        let frame = OhlcvFrame::from_bars(&input).unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.bars().unwrap(), input);
        assert_eq!(frame.close().unwrap(), vec![Some(10.0), Some(11.0), Some(12.0)]);
    }

    #[test]
    fn test_missing_column_is_named() {
        let frame = OhlcvFrame::new(df!("close" => &[1.0, 2.0]).unwrap());
        match frame.volume() {
            Err(Error::MissingColumn(name)) => assert_eq!(name, "volume"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_columns_read_as_float() {
        let frame = OhlcvFrame::new(df!("volume" => &[1i64, 2, 3]).unwrap());
        assert_eq!(frame.volume().unwrap(), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_with_values_leaves_source_untouched() {
        let frame = OhlcvFrame::from_bars(&bars()).unwrap();
        let enriched = frame.with_values("EMA", vec![Some(1.0), None, Some(3.0)]).unwrap();

        assert!(!frame.has_column("EMA"));
        assert_eq!(enriched.values("EMA").unwrap(), vec![Some(1.0), None, Some(3.0)]);

        let replaced = enriched.with_values("EMA", vec![None, None, None]).unwrap();
        assert_eq!(replaced.column_names().len(), enriched.column_names().len());
        assert_eq!(replaced.values("EMA").unwrap(), vec![None, None, None]);
    }

    #[test]
    fn test_nan_cells_read_as_missing() {
        let frame = OhlcvFrame::new(df!("close" => &[1.0, f64::NAN, 3.0]).unwrap());
        assert_eq!(frame.close().unwrap(), vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn test_incomplete_rows_are_skipped_by_bars() {
        let frame = OhlcvFrame::from_bars(&bars()).unwrap();
        let frame = frame.with_values(VOLUME, vec![Some(1.0), None, Some(f64::NAN)]).unwrap();

        let rows = frame.bars().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].close, 10.0);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let frame = OhlcvFrame::from_bars(&bars()).unwrap();
        assert!(frame.with_values("EMA", vec![Some(1.0), Some(2.0)]).is_err());
    }
}
