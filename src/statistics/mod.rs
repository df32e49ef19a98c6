pub mod rolling_stats;

pub use rolling_stats::{diff, pct_change, rolling_mean, rolling_std};
