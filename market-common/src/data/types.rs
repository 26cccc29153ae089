// market-common/src/data/types.rs
// Core data model shared by the provider, the cache and all analytics

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =================================================================
// Price Bars
// =================================================================

/// One OHLC bar of an index series.
///
/// Series handed to the analytics are ascending by `date` with no
/// duplicates. The algorithms only rely on `high >= low`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
        }
    }

    /// Finite, strictly positive prices and `high >= low`.
    pub fn is_valid(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0) && self.high >= self.low
    }
}

/// Check the ordering contract of a series: strictly increasing dates and valid bars.
pub fn validate_series(bars: &[PriceBar]) -> DataResult<()> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.is_valid() {
            return Err(DataError::Validation(format!(
                "Invalid bar at {} (index {})",
                bar.date, i
            )));
        }
    }
    if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(DataError::Validation(format!(
            "Dates not strictly increasing: {} followed by {}",
            pair[0].date, pair[1].date
        )));
    }
    Ok(())
}

// =================================================================
// Timeframes
// =================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
}

impl Timeframe {
    /// Interval code used by the chart endpoint and the bar table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1wk",
        }
    }

    /// Calendar days between two consecutive bars.
    pub fn step_days(&self) -> i64 {
        match self {
            Timeframe::Daily => 1,
            Timeframe::Weekly => 7,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" | "daily" => Ok(Timeframe::Daily),
            "1wk" | "weekly" => Ok(Timeframe::Weekly),
            other => Err(DataError::Validation(format!("Invalid timeframe: {}", other))),
        }
    }
}

// =================================================================
// Event Lifecycle
// =================================================================

/// Lifecycle of a drawdown or bias event.
///
/// `Open` events have not met their recovery condition by the last bar;
/// their recovery-side fields are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Open,
    Recovered,
}

impl EventStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, EventStatus::Open)
    }
}

// =================================================================
// Helpers
// =================================================================

/// Round a percentage for display.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Calendar-day distance, not trading days.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Percentage move from `reference` to `value`. `None` when the reference is not positive.
pub fn pct_change(reference: f64, value: f64) -> Option<f64> {
    if reference > 0.0 && reference.is_finite() {
        Some((value - reference) / reference * 100.0)
    } else {
        None
    }
}

// =================================================================
// Storage Stats
// =================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbStats {
    pub symbol: Option<String>,
    pub total_records: u64,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
}

// =================================================================
// Errors
// =================================================================

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type DataResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bar_validation() {
        assert!(PriceBar::new(date(2024, 1, 2), 10.0, 11.0, 9.0, 10.5).is_valid());
        assert!(!PriceBar::new(date(2024, 1, 2), 10.0, 9.0, 11.0, 10.5).is_valid());
        assert!(!PriceBar::new(date(2024, 1, 2), 0.0, 11.0, 9.0, 10.5).is_valid());
        assert!(!PriceBar::new(date(2024, 1, 2), f64::NAN, 11.0, 9.0, 10.5).is_valid());
    }

    #[test]
    fn test_series_must_be_strictly_increasing() {
        let a = PriceBar::new(date(2024, 1, 2), 10.0, 11.0, 9.0, 10.5);
        let b = PriceBar::new(date(2024, 1, 3), 10.0, 11.0, 9.0, 10.5);
        assert!(validate_series(&[a, b]).is_ok());
        assert!(validate_series(&[b, a]).is_err());
        assert!(validate_series(&[a, a]).is_err());
        assert!(validate_series(&[]).is_ok());
    }

    #[test]
    fn test_timeframe_parsing() {
        assert_eq!("1d".parse::<Timeframe>().unwrap(), Timeframe::Daily);
        assert_eq!("Weekly".parse::<Timeframe>().unwrap(), Timeframe::Weekly);
        assert!("1h".parse::<Timeframe>().is_err());
        assert_eq!(Timeframe::Weekly.step_days(), 7);
    }

    #[test]
    fn test_pct_change_guards_reference() {
        assert_eq!(pct_change(100.0, 110.0), Some(10.0));
        assert_eq!(pct_change(0.0, 110.0), None);
        assert_eq!(pct_change(-5.0, 110.0), None);
        assert_eq!(round2(13.636363), 13.64);
    }
}
