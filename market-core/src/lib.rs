// market-core/src/lib.rs
// Provider, configuration and dashboard service around market-common

pub mod config;
pub mod provider;
pub mod service;
pub mod universe;

// Re-export market-common for convenience
pub use market_common::{analysis, backtest, data};
