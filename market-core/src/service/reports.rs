use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use market_common::analysis::PerformanceMetrics;
use market_common::backtest::{BiasOdds, BiasRegimeEvent, MovingAverageProjection, Regime};

/// Moving-average bias panel for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    pub symbol: String,
    pub as_of: NaiveDate,
    pub last_close: f64,
    pub moving_average: Option<f64>,
    pub bias_pct: Option<f64>,
    /// Regime of the excursion still in progress, if any.
    pub current_regime: Option<Regime>,
    pub events: Vec<BiasRegimeEvent>,
    /// `None` when the latest bar has no bias yet.
    pub odds: Option<BiasOdds>,
    pub projection: MovingAverageProjection,
}

impl BiasReport {
    pub fn open_event(&self) -> Option<&BiasRegimeEvent> {
        self.events.last().filter(|e| e.is_open())
    }

    /// Distance from the last close to the final projected average, in percent.
    pub fn projected_gap_pct(&self) -> Option<f64> {
        let (_, target) = self.projection.target()?;
        (self.last_close > 0.0).then(|| (target - self.last_close) / self.last_close * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub holdings: Vec<Holding>,
    pub start_balance: f64,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub portfolio: PerformanceMetrics,
    pub benchmark_symbol: String,
    /// `None` when the benchmark shares no dates with the portfolio.
    pub benchmark: Option<PerformanceMetrics>,
}
