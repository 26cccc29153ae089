// market-common/src/analysis/stats.rs
// Summary metrics and bucketed frequency tables over completed events

use serde::{Deserialize, Serialize};

use super::drawdown::DrawdownEvent;
use crate::data::types::{DataError, DataResult, EventStatus};

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub range_label: String,
    pub count: usize,
    pub probability_pct: f64,
}

/// Ascending bucket edges. Bins are half-open `[a, b)`; the last bin is
/// `[last, +inf)` so every value lands somewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketEdges {
    edges: Vec<f64>,
}

impl BucketEdges {
    pub fn new(edges: Vec<f64>) -> DataResult<Self> {
        if edges.is_empty() {
            return Err(DataError::Validation("Bucket edges cannot be empty".into()));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(DataError::Validation("Bucket edges must be finite".into()));
        }
        if edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DataError::Validation(
                "Bucket edges must be strictly increasing".into(),
            ));
        }
        Ok(Self { edges })
    }

    /// `[0,10) ... [40,50), [50,+inf)` for residual drawdowns.
    pub fn drawdown_default() -> Self {
        Self {
            edges: vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0],
        }
    }

    /// `[0,10) ... [60,70), [70,+inf)` for rebound gains.
    pub fn gain_default() -> Self {
        Self {
            edges: vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0],
        }
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn bucket_count(&self) -> usize {
        self.edges.len()
    }

    /// Values below the first edge are clamped into the first bucket.
    fn bucket_index(&self, value: f64) -> usize {
        self.edges
            .iter()
            .rposition(|edge| value >= *edge)
            .unwrap_or(0)
    }

    fn label(&self, index: usize) -> String {
        match self.edges.get(index + 1) {
            Some(upper) => format!("{}% ~ {}%", self.edges[index], upper),
            None => format!("{}%+", self.edges[index]),
        }
    }
}

/// Bucket `values`; probabilities are relative to `total` (which may exceed
/// `values.len()`). NaN values are not counted.
pub fn distribution(values: &[f64], edges: &BucketEdges, total: usize) -> Vec<DistributionBucket> {
    let mut counts = vec![0usize; edges.bucket_count()];
    for value in values.iter().filter(|v| !v.is_nan()) {
        counts[edges.bucket_index(*value)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| DistributionBucket {
            range_label: edges.label(i),
            count,
            probability_pct: share_pct(count, total),
        })
        .collect()
}

pub(crate) fn share_pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

// =================================================================
// Drawdown Summary
// =================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSummary {
    pub total_events: usize,
    pub recovered_events: usize,
    pub open_events: usize,
    pub avg_residual_drawdown_pct: f64,
    pub avg_days_to_bottom: f64,
    pub avg_days_to_recovery: f64,
    pub prob_residual_gt_10_pct: f64,
    pub prob_residual_gt_20_pct: f64,
    pub distribution: Vec<DistributionBucket>,
}

impl DrawdownSummary {
    pub fn empty(edges: &BucketEdges) -> Self {
        summarize(&[], edges)
    }
}

/// Averages and tail probabilities use recovered events only; the
/// distribution counts every event and divides by the total event count.
pub fn summarize(events: &[DrawdownEvent], edges: &BucketEdges) -> DrawdownSummary {
    let recovered: Vec<&DrawdownEvent> = events
        .iter()
        .filter(|e| e.status == EventStatus::Recovered)
        .collect();
    let n_recovered = recovered.len();

    let residuals: Vec<f64> = events.iter().map(|e| e.residual_drawdown_pct).collect();

    DrawdownSummary {
        total_events: events.len(),
        recovered_events: n_recovered,
        open_events: events.len() - n_recovered,
        avg_residual_drawdown_pct: mean(recovered.iter().map(|e| e.residual_drawdown_pct)),
        avg_days_to_bottom: mean(recovered.iter().map(|e| e.days_to_bottom as f64)),
        avg_days_to_recovery: mean(recovered.iter().map(|e| e.days_to_recovery_or_elapsed as f64)),
        prob_residual_gt_10_pct: share_pct(
            recovered.iter().filter(|e| e.residual_drawdown_pct > 10.0).count(),
            n_recovered,
        ),
        prob_residual_gt_20_pct: share_pct(
            recovered.iter().filter(|e| e.residual_drawdown_pct > 20.0).count(),
            n_recovered,
        ),
        distribution: distribution(&residuals, edges, events.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(residual: f64, days_to_bottom: i64, days: i64, status: EventStatus) -> DrawdownEvent {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        DrawdownEvent {
            trigger_date: date,
            trigger_price: 93.0,
            prior_high: 100.0,
            prior_high_date: date,
            bottom_price: 93.0 * (1.0 - residual / 100.0),
            bottom_date: date,
            recovery_date: None,
            recovery_price: None,
            status,
            max_drawdown_pct: 7.0 + residual,
            residual_drawdown_pct: residual,
            days_to_bottom,
            days_to_recovery_or_elapsed: days,
            degenerate: false,
        }
    }

    #[test]
    fn test_edges_validation() {
        assert!(BucketEdges::new(vec![]).is_err());
        assert!(BucketEdges::new(vec![0.0, 10.0, 10.0]).is_err());
        assert!(BucketEdges::new(vec![0.0, f64::INFINITY]).is_err());
        assert!(BucketEdges::new(vec![0.0, 5.0]).is_ok());
    }

    #[test]
    fn test_distribution_half_open_with_unbounded_top() {
        let edges = BucketEdges::new(vec![0.0, 10.0, 20.0]).unwrap();
        let buckets = distribution(&[0.0, 9.99, 10.0, 25.0, 400.0, -1.0], &edges, 6);

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].range_label, "0% ~ 10%");
        assert_eq!(buckets[0].count, 3);
        assert_eq!(buckets[1].count, 1);
        assert_eq!(buckets[2].range_label, "20%+");
        assert_eq!(buckets[2].count, 2);
        let total: f64 = buckets.iter().map(|b| b.probability_pct).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_excludes_open_from_averages() {
        let events = vec![
            event(5.0, 10, 40, EventStatus::Recovered),
            event(15.0, 20, 80, EventStatus::Recovered),
            event(30.0, 30, 200, EventStatus::Open),
        ];
        let summary = summarize(&events, &BucketEdges::drawdown_default());

        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.recovered_events, 2);
        assert_eq!(summary.open_events, 1);
        assert!((summary.avg_residual_drawdown_pct - 10.0).abs() < 1e-9);
        assert!((summary.avg_days_to_bottom - 15.0).abs() < 1e-9);
        assert!((summary.avg_days_to_recovery - 60.0).abs() < 1e-9);
        assert!((summary.prob_residual_gt_10_pct - 50.0).abs() < 1e-9);
        assert_eq!(summary.prob_residual_gt_20_pct, 0.0);

        let counted: usize = summary.distribution.iter().map(|b| b.count).sum();
        assert_eq!(counted, 3);
        assert!((summary.distribution[3].probability_pct - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = DrawdownSummary::empty(&BucketEdges::drawdown_default());
        assert_eq!(summary.total_events, 0);
        assert_eq!(summary.avg_residual_drawdown_pct, 0.0);
        assert!(summary.distribution.iter().all(|b| b.count == 0 && b.probability_pct == 0.0));
    }
}
