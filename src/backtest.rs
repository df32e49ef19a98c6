use log::{debug, warn};

use crate::statistics::{pct_change, rolling_mean};

/// Side of the crossover signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Long,
    Short,
}

impl Position {
    pub fn sign(self) -> i32 {
        match self {
            Position::Long => 1,
            Position::Short => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub fast_ma: Vec<Option<f64>>,
    pub slow_ma: Vec<Option<f64>>,
    pub position: Vec<Option<Position>>,
    pub period_return: Vec<Option<f64>>,
    pub strategy_return: Vec<Option<f64>>,
    pub equity: Vec<f64>,
}

/// Long when the fast average is above the slow one, short otherwise.
/// Undefined while either average is still warming up.
pub fn crossover_positions(fast_ma: &[Option<f64>], slow_ma: &[Option<f64>]) -> Vec<Option<Position>> {
    fast_ma
        .iter()
        .zip(slow_ma)
        .map(|(fast, slow)| {
            let (fast, slow) = ((*fast)?, (*slow)?);
            Some(if fast > slow {
                Position::Long
            } else {
                Position::Short
            })
        })
        .collect()
}

/// Return earned at bar `i` by holding the position observed at bar `i - 1`.
pub fn strategy_returns(
    position: &[Option<Position>],
    period_return: &[Option<f64>],
) -> Vec<Option<f64>> {
    (0..period_return.len())
        .map(|i| {
            if i == 0 {
                return None;
            }
            let held = position.get(i - 1).copied().flatten()?;
            Some(held.sign() as f64 * period_return[i]?)
        })
        .collect()
}

/// Compounded growth of 1.0. Undefined returns leave the curve flat.
pub fn equity_curve(strategy_return: &[Option<f64>]) -> Vec<f64> {
    let mut equity = 1.0;
    strategy_return
        .iter()
        .map(|r| {
            equity *= 1.0 + r.unwrap_or(0.0);
            equity
        })
        .collect()
}

/// A fast window that is not shorter than the slow one never leads the slow
/// average, so the crossover carries no signal.
pub fn is_degenerate(fast: usize, slow: usize) -> bool {
    fast >= slow
}

pub fn run_backtest(close: &[Option<f64>], fast: usize, slow: usize) -> BacktestResult {
    if is_degenerate(fast, slow) {
        warn!(
            "Fast window ({}) is not shorter than slow window ({}); crossover signal degenerates",
            fast, slow
        );
    }

    let fast_ma = rolling_mean(close, fast);
    let slow_ma = rolling_mean(close, slow);
    let position = crossover_positions(&fast_ma, &slow_ma);
    let period_return = pct_change(close);
    let strategy_return = strategy_returns(&position, &period_return);
    let equity = equity_curve(&strategy_return);

    debug!(
        "Backtest fast={} slow={} over {} bars, final equity {:?}",
        fast,
        slow,
        close.len(),
        equity.last()
    );

    BacktestResult {
        fast_ma,
        slow_ma,
        position,
        period_return,
        strategy_return,
        equity,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub final_equity: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub position_changes: usize,
    pub bars_in_market: usize,
}

impl BacktestSummary {
    pub fn from_result(result: &BacktestResult) -> Self {
        let final_equity = result.equity.last().copied().unwrap_or(1.0);

        let mut high_water_mark = 1.0f64;
        let mut max_drawdown = 0.0f64;
        for &equity in &result.equity {
            if equity > high_water_mark {
                high_water_mark = equity;
            } else if high_water_mark > 0.0 {
                let drawdown = (high_water_mark - equity) / high_water_mark;
                max_drawdown = max_drawdown.max(drawdown);
            }
        }

        let position_changes = result
            .position
            .windows(2)
            .filter(|w| matches!((w[0], w[1]), (Some(a), Some(b)) if a != b))
            .count();
        let bars_in_market = result.position.iter().filter(|p| p.is_some()).count();

        Self {
            final_equity,
            total_return: final_equity - 1.0,
            max_drawdown,
            position_changes,
            bars_in_market,
        }
    }
}

impl std::fmt::Display for BacktestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Final equity:     {:.4}", self.final_equity)?;
        writeln!(f, "Total return:     {:.2}%", self.total_return * 100.0)?;
        writeln!(f, "Max drawdown:     {:.2}%", self.max_drawdown * 100.0)?;
        writeln!(f, "Position changes: {}", self.position_changes)?;
        write!(f, "Bars in market:   {}", self.bars_in_market)
    }
}
