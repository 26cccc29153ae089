// market-common/src/analysis/monitor.rs
// Live status of the most recent bar relative to the drawdown trigger

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::drawdown::{open_event, DrawdownEvent};
use super::stats::DrawdownSummary;
use crate::data::types::PriceBar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownStatus {
    pub as_of: NaiveDate,
    pub last_close: f64,
    pub reference_high: f64,
    pub current_drawdown_pct: f64,
    pub triggered: bool,
    /// Additional decline still needed to reach the trigger; zero once triggered.
    pub distance_to_trigger_pct: f64,
    /// Historical share of recovered events that fell more than 10% past the trigger.
    pub prob_residual_gt_10_pct: f64,
    pub in_open_event: bool,
}

/// Drawdown of the last close from the relevant high.
///
/// Inside an open event the reference is that event's prior high; otherwise
/// it is the highest high since the last recovery (or the whole series).
pub fn current_drawdown(
    bars: &[PriceBar],
    events: &[DrawdownEvent],
    summary: &DrawdownSummary,
    trigger_pct: f64,
) -> Option<DrawdownStatus> {
    let last = bars.last()?;

    let (reference_high, in_open_event) = match open_event(events) {
        Some(event) => (event.prior_high, true),
        None => {
            let since = events.last().and_then(|e| e.recovery_date);
            let start = since.map_or(0, |d| bars.partition_point(|b| b.date < d));
            let high = bars[start..]
                .iter()
                .map(|b| b.high)
                .fold(f64::NEG_INFINITY, f64::max);
            (high, false)
        }
    };

    let current_drawdown_pct = if reference_high > 0.0 && reference_high.is_finite() {
        ((reference_high - last.close) / reference_high * 100.0).max(0.0)
    } else {
        0.0
    };

    Some(DrawdownStatus {
        as_of: last.date,
        last_close: last.close,
        reference_high,
        current_drawdown_pct,
        triggered: current_drawdown_pct >= trigger_pct,
        distance_to_trigger_pct: (trigger_pct - current_drawdown_pct).max(0.0),
        prob_residual_gt_10_pct: summary.prob_residual_gt_10_pct,
        in_open_event,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::drawdown::track;
    use crate::analysis::stats::{summarize, BucketEdges};
    use chrono::Duration;

    fn bars_from(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(start + Duration::days(i as i64), c, c, c, c))
            .collect()
    }

    fn status_for(closes: &[f64]) -> Option<DrawdownStatus> {
        let bars = bars_from(closes);
        let events = track(&bars, 7.0);
        let summary = summarize(&events, &BucketEdges::drawdown_default());
        current_drawdown(&bars, &events, &summary, 7.0)
    }

    #[test]
    fn test_empty_series_has_no_status() {
        assert!(status_for(&[]).is_none());
    }

    #[test]
    fn test_open_event_measures_from_prior_high() {
        let status = status_for(&[100.0, 90.0, 88.0, 95.0]).unwrap();
        assert!(status.in_open_event);
        assert!(!status.triggered);
        assert_eq!(status.reference_high, 100.0);
        assert!((status.current_drawdown_pct - 5.0).abs() < 1e-9);
        assert_eq!(status.distance_to_trigger_pct, 2.0);
    }

    #[test]
    fn test_deep_open_event_is_triggered() {
        let status = status_for(&[100.0, 92.0, 85.0]).unwrap();
        assert!(status.triggered);
        assert_eq!(status.distance_to_trigger_pct, 0.0);
        assert_eq!(status.prob_residual_gt_10_pct, 0.0);
    }

    #[test]
    fn test_after_recovery_uses_high_since_recovery() {
        let status = status_for(&[100.0, 92.0, 101.0, 110.0, 106.0]).unwrap();
        assert!(!status.in_open_event);
        assert!(!status.triggered);
        assert_eq!(status.reference_high, 110.0);
        let expected = (110.0 - 106.0) / 110.0 * 100.0;
        assert!((status.current_drawdown_pct - expected).abs() < 1e-9);
    }
}
