use crate::errors::{Error, Result};
use crate::indicators::EmaWeighting;

/// Window lengths and spans chosen by the user for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    pub ema_span: usize,
    pub rsi_length: usize,
    pub fast_ma: usize,
    pub slow_ma: usize,
    pub ema_weighting: EmaWeighting,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            ema_span: 50,
            rsi_length: 14,
            fast_ma: 10,
            slow_ma: 50,
            ema_weighting: EmaWeighting::default(),
        }
    }
}

impl ParameterSet {
    pub fn new(ema_span: usize, rsi_length: usize, fast_ma: usize, slow_ma: usize) -> Self {
        Self {
            ema_span,
            rsi_length,
            fast_ma,
            slow_ma,
            ema_weighting: EmaWeighting::default(),
        }
    }

    pub fn with_ema_weighting(mut self, weighting: EmaWeighting) -> Self {
        self.ema_weighting = weighting;
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_window("ema_span", self.ema_span)?;
        require_window("rsi_length", self.rsi_length)?;
        require_window("fast_ma", self.fast_ma)?;
        require_window("slow_ma", self.slow_ma)
    }
}

/// Extra research columns: plain returns, a set of SMAs and rolling volatility.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchParams {
    pub sma_windows: Vec<usize>,
    pub volatility_window: usize,
}

impl Default for ResearchParams {
    fn default() -> Self {
        Self {
            sma_windows: vec![20, 50, 200],
            volatility_window: 20,
        }
    }
}

impl ResearchParams {
    pub fn validate(&self) -> Result<()> {
        for &window in &self.sma_windows {
            require_window("sma_windows", window)?;
        }
        require_window("volatility_window", self.volatility_window)
    }
}

pub(crate) fn require_window(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidParameter {
            name: name.to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}
