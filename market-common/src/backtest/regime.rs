// market-common/src/backtest/regime.rs
// Regime label from the severity of the trailing drawdown before a trigger

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::indicators::BiasBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// The trailing window already contained a severe decline.
    LowBaseRebound,
    /// No severe decline in the trailing window.
    HighExtension,
    /// No history before the trigger.
    Unknown,
}

impl Regime {
    pub fn label(&self) -> &'static str {
        match self {
            Regime::LowBaseRebound => "low-base rebound",
            Regime::HighExtension => "high extension",
            Regime::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeReading {
    pub regime: Regime,
    /// Deepest low-versus-running-high decline in the window, as a negative percentage.
    pub trailing_max_drawdown_pct: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegimeError {
    #[error("Date {0} is not present in the series")]
    MisalignedDate(NaiveDate),
}

#[derive(Debug, Clone, Copy)]
pub struct RegimeClassifier {
    pub lookback: usize,
    pub severity_cutoff: f64,
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self {
            lookback: 52,
            severity_cutoff: -20.0,
        }
    }
}

impl RegimeClassifier {
    pub fn new(lookback: usize, severity_cutoff: f64) -> Self {
        Self {
            lookback,
            severity_cutoff,
        }
    }

    /// Classify using up to `lookback` bars strictly before `index`.
    pub fn classify_at(&self, bars: &[BiasBar], index: usize) -> RegimeReading {
        let end = index.min(bars.len());
        let start = end.saturating_sub(self.lookback);
        let window = &bars[start..end];

        let mut running_high = f64::NEG_INFINITY;
        let mut deepest: Option<f64> = None;
        for b in window {
            running_high = running_high.max(b.bar.high);
            if running_high <= 0.0 {
                continue;
            }
            let drawdown = (b.bar.low - running_high) / running_high * 100.0;
            deepest = Some(deepest.map_or(drawdown, |d: f64| d.min(drawdown)));
        }

        match deepest {
            None => RegimeReading {
                regime: Regime::Unknown,
                trailing_max_drawdown_pct: 0.0,
            },
            Some(max_dd) if max_dd <= self.severity_cutoff => RegimeReading {
                regime: Regime::LowBaseRebound,
                trailing_max_drawdown_pct: max_dd,
            },
            Some(max_dd) => RegimeReading {
                regime: Regime::HighExtension,
                trailing_max_drawdown_pct: max_dd,
            },
        }
    }

    /// Classify the bar dated exactly `date`. No nearest-date fallback.
    pub fn classify_date(
        &self,
        bars: &[BiasBar],
        date: NaiveDate,
    ) -> Result<RegimeReading, RegimeError> {
        let index = bars
            .binary_search_by_key(&date, BiasBar::date)
            .map_err(|_| RegimeError::MisalignedDate(date))?;
        Ok(self.classify_at(bars, index))
    }
}
