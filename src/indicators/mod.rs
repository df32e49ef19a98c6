pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;

pub use ema::{ema, EmaWeighting};
pub use macd::{macd, Macd, MACD_FAST, MACD_SIGNAL, MACD_SLOW};
pub use obv::obv;
pub use rsi::rsi;
