use super::ema::{ema, EmaWeighting};

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub ema_fast: Vec<Option<f64>>,
    pub ema_slow: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// MACD line (EMA 12 - EMA 26), its EMA 9 signal line and their difference.
pub fn macd(close: &[Option<f64>], weighting: EmaWeighting) -> Macd {
    let ema_fast = ema(close, MACD_FAST, weighting);
    let ema_slow = ema(close, MACD_SLOW, weighting);
    let macd = subtract(&ema_fast, &ema_slow);
    let signal = ema(&macd, MACD_SIGNAL, weighting);
    let histogram = subtract(&macd, &signal);

    Macd {
        ema_fast,
        ema_slow,
        macd,
        signal,
        histogram,
    }
}

fn subtract(lhs: &[Option<f64>], rhs: &[Option<f64>]) -> Vec<Option<f64>> {
    lhs.iter()
        .zip(rhs)
        .map(|(a, b)| Some((*a)? - (*b)?))
        .collect()
}
