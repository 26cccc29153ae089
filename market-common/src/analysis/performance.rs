// market-common/src/analysis/performance.rs
// Growth-curve metrics: CAGR, max drawdown, best/worst calendar year

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::data::types::PriceBar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub final_balance: f64,
    pub cagr_pct: f64,
    /// Deepest peak-to-trough decline, as a negative percentage.
    pub max_drawdown_pct: f64,
    pub best_year_pct: f64,
    pub worst_year_pct: f64,
}

impl PerformanceMetrics {
    /// Metrics for a growth curve (ascending dates, positive values).
    ///
    /// Calendar-year returns compare consecutive year-end values, so the
    /// first year in the curve contributes no return.
    pub fn from_curve(points: &[(NaiveDate, f64)], start_balance: f64) -> Option<Self> {
        let (first_date, first_value) = *points.first()?;
        let (last_date, last_value) = *points.last()?;
        if first_value <= 0.0 {
            return None;
        }

        let growth = last_value / first_value;
        let years = (last_date - first_date).num_days() as f64 / 365.25;
        let cagr_pct = if years > 0.0 {
            (growth.powf(1.0 / years) - 1.0) * 100.0
        } else {
            0.0
        };

        let mut peak = f64::NEG_INFINITY;
        let mut max_drawdown = 0.0_f64;
        for &(_, value) in points {
            peak = peak.max(value);
            if peak > 0.0 {
                max_drawdown = max_drawdown.min((value - peak) / peak);
            }
        }

        let mut year_ends: Vec<(i32, f64)> = Vec::new();
        for &(date, value) in points {
            match year_ends.last_mut() {
                Some((year, last)) if *year == date.year() => *last = value,
                _ => year_ends.push((date.year(), value)),
            }
        }
        let yearly_returns: Vec<f64> = year_ends
            .windows(2)
            .filter(|w| w[0].1 > 0.0)
            .map(|w| (w[1].1 / w[0].1 - 1.0) * 100.0)
            .collect();

        Some(Self {
            final_balance: growth * start_balance,
            cagr_pct,
            max_drawdown_pct: max_drawdown * 100.0,
            best_year_pct: yearly_returns.iter().copied().fold(None, |acc: Option<f64>, r| {
                Some(acc.map_or(r, |a| a.max(r)))
            })
            .unwrap_or(0.0),
            worst_year_pct: yearly_returns.iter().copied().fold(None, |acc: Option<f64>, r| {
                Some(acc.map_or(r, |a| a.min(r)))
            })
            .unwrap_or(0.0),
        })
    }
}

/// Close-to-close growth factors starting at 1.0.
pub fn growth_curve(bars: &[PriceBar]) -> Vec<(NaiveDate, f64)> {
    let Some(first) = bars.first() else {
        return Vec::new();
    };
    if first.close <= 0.0 {
        return Vec::new();
    }
    bars.iter().map(|b| (b.date, b.close / first.close)).collect()
}

/// Buy-and-hold growth of weighted holdings over the dates all of them share.
///
/// Each holding is normalized to its close on the first shared date.
pub fn buy_and_hold_curve(holdings: &[(f64, &[PriceBar])]) -> Vec<(NaiveDate, f64)> {
    let Some((_, first)) = holdings.first() else {
        return Vec::new();
    };

    let close_on = |bars: &[PriceBar], date: NaiveDate| {
        bars.binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| bars[i].close)
    };

    let shared: Vec<NaiveDate> = first
        .iter()
        .map(|b| b.date)
        .filter(|d| holdings.iter().all(|(_, bars)| close_on(bars, *d).is_some()))
        .collect();
    let Some(&base_date) = shared.first() else {
        return Vec::new();
    };

    let mut bases = Vec::with_capacity(holdings.len());
    for (_, bars) in holdings {
        match close_on(bars, base_date) {
            Some(base) if base > 0.0 => bases.push(base),
            _ => return Vec::new(),
        }
    }

    shared
        .into_iter()
        .map(|date| {
            let value = holdings
                .iter()
                .zip(&bases)
                .filter_map(|((weight, bars), base)| close_on(bars, date).map(|c| weight * c / base))
                .sum::<f64>();
            (date, value)
        })
        .collect()
}
