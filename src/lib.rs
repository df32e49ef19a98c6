pub mod backtest;
pub mod cli;
pub mod data;
pub mod errors;
pub mod indicators;
pub mod models;
pub mod pipeline;
pub mod statistics;

pub use errors::{Error, Result};
