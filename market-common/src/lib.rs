// market-common/src/lib.rs
// Shared data model and the drawdown / wave / bias analytics

pub mod analysis;
pub mod backtest;
pub mod data;

pub use data::types::{EventStatus, PriceBar, Timeframe};
