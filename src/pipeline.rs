//! Indicator and backtest pipeline.
//!
//! Every step reads raw columns (`close`, `volume`) from the frame it is
//! given and returns a new frame with its derived columns added, so steps can
//! run in any order and the input frame is never modified.

use log::{debug, info};
use polars::prelude::Column;

use crate::backtest::{run_backtest, BacktestSummary};
use crate::data::OhlcvFrame;
use crate::errors::{Error, Result};
use crate::indicators::{ema, macd, obv, rsi, EmaWeighting};
use crate::models::params::require_window;
use crate::models::{ParameterSet, ResearchParams};
use crate::statistics::{pct_change, rolling_mean, rolling_std};

/// Names of the derived columns.
pub mod columns {
    pub const EMA: &str = "EMA";
    pub const RSI: &str = "RSI";
    pub const EMA_FAST: &str = "EMA_fast";
    pub const EMA_SLOW: &str = "EMA_slow";
    pub const MACD: &str = "MACD";
    pub const SIGNAL: &str = "Signal";
    pub const HISTOGRAM: &str = "Histogram";
    pub const OBV: &str = "OBV";
    pub const FAST_MA: &str = "fast_ma";
    pub const SLOW_MA: &str = "slow_ma";
    pub const POSITION: &str = "position";
    pub const PERIOD_RETURN: &str = "period_return";
    pub const STRATEGY_RETURN: &str = "strategy_return";
    pub const EQUITY: &str = "equity";
    pub const RETURN: &str = "return";
    pub const VOLATILITY: &str = "volatility";

    pub fn sma(window: usize) -> String {
        format!("sma_{}", window)
    }
}

pub fn with_ema(frame: &OhlcvFrame, span: usize, weighting: EmaWeighting) -> Result<OhlcvFrame> {
    require_window("ema_span", span)?;
    let close = frame.close()?;
    frame.with_values(columns::EMA, ema(&close, span, weighting))
}

pub fn with_rsi(frame: &OhlcvFrame, length: usize) -> Result<OhlcvFrame> {
    require_window("rsi_length", length)?;
    let close = frame.close()?;
    frame.with_values(columns::RSI, rsi(&close, length))
}

pub fn with_macd(frame: &OhlcvFrame, weighting: EmaWeighting) -> Result<OhlcvFrame> {
    let lines = macd(&frame.close()?, weighting);
    frame.with_many(vec![
        (columns::EMA_FAST, lines.ema_fast),
        (columns::EMA_SLOW, lines.ema_slow),
        (columns::MACD, lines.macd),
        (columns::SIGNAL, lines.signal),
        (columns::HISTOGRAM, lines.histogram),
    ])
}

pub fn with_obv(frame: &OhlcvFrame) -> Result<OhlcvFrame> {
    let close = frame.close()?;
    let volume = frame.volume()?;
    frame.with_values(columns::OBV, obv(&close, &volume))
}

/// Adds the crossover backtest columns and returns its summary alongside.
pub fn with_backtest(
    frame: &OhlcvFrame,
    fast: usize,
    slow: usize,
) -> Result<(OhlcvFrame, BacktestSummary)> {
    require_window("fast_ma", fast)?;
    require_window("slow_ma", slow)?;
    let result = run_backtest(&frame.close()?, fast, slow);
    let summary = BacktestSummary::from_result(&result);

    let position: Vec<Option<i32>> = result.position.iter().map(|p| p.map(|p| p.sign())).collect();
    let equity: Vec<Option<f64>> = result.equity.iter().copied().map(Some).collect();

    let enriched = frame
        .with_many(vec![
            (columns::FAST_MA, result.fast_ma),
            (columns::SLOW_MA, result.slow_ma),
        ])?
        .with_column(Column::new(columns::POSITION.into(), position))?
        .with_many(vec![
            (columns::PERIOD_RETURN, result.period_return),
            (columns::STRATEGY_RETURN, result.strategy_return),
            (columns::EQUITY, equity),
        ])?;

    Ok((enriched, summary))
}

pub fn with_returns(frame: &OhlcvFrame) -> Result<OhlcvFrame> {
    let close = frame.close()?;
    frame.with_values(columns::RETURN, pct_change(&close))
}

pub fn with_moving_averages(frame: &OhlcvFrame, windows: &[usize]) -> Result<OhlcvFrame> {
    let close = frame.close()?;
    let mut averages = Vec::with_capacity(windows.len());
    for &window in windows {
        require_window("sma_windows", window)?;
        averages.push((columns::sma(window), rolling_mean(&close, window)));
    }
    frame.with_many(
        averages
            .iter()
            .map(|(name, values)| (name.as_str(), values.clone()))
            .collect(),
    )
}

/// Sample standard deviation of close-to-close returns.
pub fn with_volatility(frame: &OhlcvFrame, window: usize) -> Result<OhlcvFrame> {
    require_window("volatility_window", window)?;
    let returns = pct_change(&frame.close()?);
    frame.with_values(columns::VOLATILITY, rolling_std(&returns, window))
}

pub fn research(frame: &OhlcvFrame, params: &ResearchParams) -> Result<OhlcvFrame> {
    params.validate()?;
    let frame = with_returns(frame)?;
    let frame = with_moving_averages(&frame, &params.sma_windows)?;
    with_volatility(&frame, params.volatility_window)
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub frame: OhlcvFrame,
    pub summary: BacktestSummary,
}

/// Runs every indicator and the backtest over `frame`.
///
/// Fails with [`Error::EmptySeries`] on a frame without rows; the kernels
/// themselves accept empty input.
pub fn run(frame: &OhlcvFrame, params: &ParameterSet) -> Result<PipelineOutput> {
    params.validate()?;
    if frame.is_empty() {
        return Err(Error::EmptySeries);
    }
    debug!("Running pipeline over {} rows with {:?}", frame.len(), params);

    let enriched = with_ema(frame, params.ema_span, params.ema_weighting)?;
    let enriched = with_rsi(&enriched, params.rsi_length)?;
    let enriched = with_macd(&enriched, params.ema_weighting)?;
    let enriched = with_obv(&enriched)?;
    let (enriched, summary) = with_backtest(&enriched, params.fast_ma, params.slow_ma)?;

    info!(
        "Pipeline done: {} rows, final equity {:.4}, max drawdown {:.2}%",
        enriched.len(),
        summary.final_equity,
        summary.max_drawdown * 100.0
    );

    Ok(PipelineOutput {
        frame: enriched,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::read_csv_bytes;
    use approx::assert_relative_eq;
    use polars::prelude::df;

    fn frame(close: &[f64], volume: &[f64]) -> OhlcvFrame {
        OhlcvFrame::new(df!("close" => close, "volume" => volume).unwrap())
    }

    #[test]
    fn test_run_adds_named_columns() {
        let input = frame(&[10.0, 11.0, 12.0, 11.0, 10.0], &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let output = run(&input, &ParameterSet::new(3, 2, 1, 2)).unwrap();

        for name in [
            columns::EMA,
            columns::RSI,
            columns::EMA_FAST,
            columns::EMA_SLOW,
            columns::MACD,
            columns::SIGNAL,
            columns::HISTOGRAM,
            columns::OBV,
            columns::FAST_MA,
            columns::SLOW_MA,
            columns::POSITION,
            columns::PERIOD_RETURN,
            columns::STRATEGY_RETURN,
            columns::EQUITY,
        ] {
            assert!(output.frame.has_column(name), "missing {}", name);
        }
        assert_eq!(output.frame.len(), 5);
        assert!(!input.has_column(columns::EMA));

        let slow = output.frame.values(columns::SLOW_MA).unwrap();
        assert_relative_eq!(slow[2].unwrap(), 11.5);
        let position = output.frame.values(columns::POSITION).unwrap();
        assert_eq!(position, vec![None, Some(1.0), Some(1.0), Some(-1.0), Some(-1.0)]);
        assert_eq!(
            output.frame.values(columns::OBV).unwrap(),
            vec![Some(0.0), Some(2.0), Some(5.0), Some(1.0), Some(-4.0)]
        );
    }

    #[test]
    fn test_nan_close_is_treated_as_missing() {
        let csv = "close,volume\n10,1\nNaN,1\n11,1\n12,1\n13,1\n";
        let input = read_csv_bytes(csv.as_bytes().to_vec()).unwrap();
        let output = run(&input, &ParameterSet::new(3, 2, 1, 2)).unwrap();

        assert_eq!(
            output.frame.values(columns::EMA).unwrap(),
            vec![Some(10.0), None, Some(10.5), Some(11.25), Some(12.125)]
        );
        for value in output.frame.values(columns::EQUITY).unwrap() {
            assert!(value.unwrap().is_finite());
        }
        assert!(output.summary.final_equity.is_finite());
        assert!(output.summary.max_drawdown.is_finite());
    }

    #[test]
    fn test_step_order_does_not_matter() {
        let input = frame(&[3.0, 4.0, 2.0, 5.0, 6.0, 4.0], &[9.0, 8.0, 7.0, 6.0, 5.0, 4.0]);

        let a = with_obv(&with_rsi(&with_ema(&input, 3, EmaWeighting::Recursive).unwrap(), 2).unwrap()).unwrap();
        let b = with_ema(&with_rsi(&with_obv(&input).unwrap(), 2).unwrap(), 3, EmaWeighting::Recursive).unwrap();

        for name in [columns::EMA, columns::RSI, columns::OBV] {
            assert_eq!(a.values(name).unwrap(), b.values(name).unwrap());
        }
    }

    #[test]
    fn test_single_row() {
        let output = run(&frame(&[100.0], &[1.0]), &ParameterSet::default()).unwrap();
        assert_eq!(output.frame.values(columns::EMA).unwrap(), vec![Some(100.0)]);
        assert_eq!(output.frame.values(columns::MACD).unwrap(), vec![Some(0.0)]);
        assert_eq!(output.frame.values(columns::SIGNAL).unwrap(), vec![Some(0.0)]);
        assert_eq!(output.frame.values(columns::RSI).unwrap(), vec![None]);
        assert_eq!(output.frame.values(columns::POSITION).unwrap(), vec![None]);
        assert_eq!(output.frame.values(columns::EQUITY).unwrap(), vec![Some(1.0)]);
        assert_eq!(output.summary.final_equity, 1.0);
    }

    #[test]
    fn test_empty_series_is_rejected() {
        let empty = frame(&[], &[]);
        assert!(matches!(run(&empty, &ParameterSet::default()), Err(Error::EmptySeries)));
        // individual steps accept it
        assert!(with_ema(&empty, 5, EmaWeighting::Recursive).unwrap().is_empty());
    }

    #[test]
    fn test_missing_columns_are_named() {
        let no_volume = OhlcvFrame::new(df!("close" => &[1.0, 2.0]).unwrap());
        match run(&no_volume, &ParameterSet::default()) {
            Err(Error::MissingColumn(name)) => assert_eq!(name, "volume"),
            other => panic!("expected MissingColumn, got {:?}", other.map(|o| o.summary)),
        }

        let no_close = OhlcvFrame::new(df!("volume" => &[1.0, 2.0]).unwrap());
        match with_ema(&no_close, 5, EmaWeighting::Recursive) {
            Err(Error::MissingColumn(name)) => assert_eq!(name, "close"),
            other => panic!("expected MissingColumn, got {:?}", other.map(|f| f.len())),
        }
    }

    #[test]
    fn test_invalid_parameters_fail_before_computing() {
        let input = frame(&[1.0, 2.0], &[1.0, 1.0]);
        assert!(matches!(
            run(&input, &ParameterSet::new(0, 14, 10, 50)),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(with_rsi(&input, 0).is_err());
    }

    #[test]
    fn test_flat_prices_keep_equity_at_one() {
        let input = frame(&[50.0; 40], &[1.0; 40]);
        let output = run(&input, &ParameterSet::new(5, 5, 3, 8)).unwrap();
        for value in output.frame.values(columns::EQUITY).unwrap() {
            assert_eq!(value, Some(1.0));
        }
    }

    #[test]
    fn test_research_columns() {
        let close: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let volume = vec![1.0; 30];
        let params = ResearchParams {
            sma_windows: vec![5, 20],
            volatility_window: 10,
        };
        let output = research(&frame(&close, &volume), &params).unwrap();

        let returns = output.values(columns::RETURN).unwrap();
        assert!(returns[0].is_none());
        assert_relative_eq!(returns[1].unwrap(), 1.0);

        let sma_5 = output.values("sma_5").unwrap();
        assert!(sma_5[3].is_none());
        assert_relative_eq!(sma_5[4].unwrap(), 3.0);
        assert!(output.has_column("sma_20"));

        let volatility = output.values(columns::VOLATILITY).unwrap();
        assert!(volatility[9].is_none());
        assert!(volatility[10].unwrap() > 0.0);
    }
}
