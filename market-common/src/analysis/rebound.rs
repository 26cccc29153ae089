// market-common/src/analysis/rebound.rs
// Rebound legs: how far price runs from a drawdown bottom before the next sell-off

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::drawdown::DrawdownEvent;
use super::stats::{distribution, mean, share_pct, BucketEdges, DistributionBucket};
use super::wave::{Wave, WaveType};
use crate::data::types::{days_between, pct_change, EventStatus, PriceBar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegStatus {
    Completed,
    Ongoing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReboundLeg {
    pub start_date: NaiveDate,
    pub start_price: f64,
    pub end_date: NaiveDate,
    pub end_price: f64,
    pub gain_pct: f64,
    pub days: i64,
    pub status: LegStatus,
}

impl ReboundLeg {
    /// `None` when the start price is not positive.
    fn build(
        start_date: NaiveDate,
        start_price: f64,
        end_date: NaiveDate,
        end_price: f64,
        status: LegStatus,
    ) -> Option<Self> {
        let gain_pct = pct_change(start_price, end_price)?;
        Some(Self {
            start_date,
            start_price,
            end_date,
            end_price,
            gain_pct,
            days: days_between(start_date, end_date),
            status,
        })
    }
}

/// Legs from each event's bottom to the next event's prior high.
///
/// After the final event: nothing if it is still open, otherwise an ongoing
/// leg to the highest high since its recovery.
pub fn legs_from_drawdowns(events: &[DrawdownEvent], bars: &[PriceBar]) -> Vec<ReboundLeg> {
    let mut legs = Vec::with_capacity(events.len());

    for (i, event) in events.iter().enumerate() {
        let leg = match events.get(i + 1) {
            Some(next) => ReboundLeg::build(
                event.bottom_date,
                event.bottom_price,
                next.prior_high_date,
                next.prior_high,
                LegStatus::Completed,
            ),
            None => {
                if event.status == EventStatus::Open {
                    continue;
                }
                let since = event.recovery_date.unwrap_or(event.bottom_date);
                highest_high_since(bars, since).and_then(|(date, high)| {
                    ReboundLeg::build(
                        event.bottom_date,
                        event.bottom_price,
                        date,
                        high,
                        LegStatus::Ongoing,
                    )
                })
            }
        };
        legs.extend(leg);
    }

    legs
}

/// Every up wave as a leg; the trailing unconfirmed wave becomes an ongoing leg.
/// The leading stretch before the first confirmed wave is skipped.
pub fn legs_from_waves(waves: &[Wave]) -> Vec<ReboundLeg> {
    waves
        .iter()
        .filter(|w| w.wave_type == WaveType::Up && !w.leading)
        .filter_map(|w| {
            let status = if w.ongoing {
                LegStatus::Ongoing
            } else {
                LegStatus::Completed
            };
            ReboundLeg::build(w.start_date, w.start_price, w.end_date, w.end_price, status)
        })
        .collect()
}

fn highest_high_since(bars: &[PriceBar], since: NaiveDate) -> Option<(NaiveDate, f64)> {
    let start = bars.partition_point(|b| b.date < since);
    bars[start..]
        .iter()
        .fold(None, |best: Option<(NaiveDate, f64)>, bar| match best {
            Some((_, high)) if high >= bar.high => best,
            _ => Some((bar.date, bar.high)),
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSummary {
    /// Number of legs the statistics were computed over.
    pub total_legs: usize,
    pub avg_gain_pct: f64,
    pub avg_days: f64,
    pub prob_gain_ge_20_pct: f64,
    pub distribution: Vec<DistributionBucket>,
}

/// Statistics over completed legs, or over all legs when none has completed yet.
pub fn summarize_legs(legs: &[ReboundLeg], edges: &BucketEdges) -> LegSummary {
    let completed: Vec<&ReboundLeg> = legs
        .iter()
        .filter(|l| l.status == LegStatus::Completed)
        .collect();
    let basis: Vec<&ReboundLeg> = if completed.is_empty() {
        legs.iter().collect()
    } else {
        completed
    };

    let total = basis.len();
    let gains: Vec<f64> = basis.iter().map(|l| l.gain_pct).collect();

    LegSummary {
        total_legs: total,
        avg_gain_pct: mean(gains.iter().copied()),
        avg_days: mean(basis.iter().map(|l| l.days as f64)),
        prob_gain_ge_20_pct: share_pct(gains.iter().filter(|g| **g >= 20.0).count(), total),
        distribution: distribution(&gains, edges, total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::drawdown::track;
    use crate::analysis::wave::segment;
    use chrono::Duration;

    fn bars_from(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(start + Duration::days(i as i64), c, c, c, c))
            .collect()
    }

    #[test]
    fn test_legs_chain_bottom_to_next_prior_high() {
        let bars = bars_from(&[100.0, 92.0, 90.0, 100.0, 120.0, 110.0, 121.0, 130.0, 125.0]);
        let events = track(&bars, 7.0);
        assert_eq!(events.len(), 2);

        let legs = legs_from_drawdowns(&events, &bars);
        assert_eq!(legs.len(), 2);

        assert_eq!(legs[0].status, LegStatus::Completed);
        assert_eq!(legs[0].start_price, 90.0);
        assert_eq!(legs[0].end_price, 120.0);
        assert!((legs[0].gain_pct - 33.333).abs() < 0.01);
        assert_eq!(legs[0].days, 2);

        assert_eq!(legs[1].status, LegStatus::Ongoing);
        assert_eq!(legs[1].start_price, 110.0);
        assert_eq!(legs[1].end_price, 130.0);
    }

    #[test]
    fn test_open_final_event_has_no_leg() {
        let bars = bars_from(&[100.0, 92.0, 100.0, 120.0, 110.0, 105.0]);
        let events = track(&bars, 7.0);
        let legs = legs_from_drawdowns(&events, &bars);

        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].status, LegStatus::Completed);
    }

    #[test]
    fn test_legs_from_waves_keep_up_waves_only() {
        let bars = bars_from(&[100.0, 115.0, 120.0, 105.0, 100.0, 112.0, 125.0]);
        let legs = legs_from_waves(&segment(&bars, 10.0));

        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].status, LegStatus::Completed);
        assert!((legs[0].gain_pct - 20.0).abs() < 1e-9);
        assert_eq!(legs[1].status, LegStatus::Ongoing);
    }

    #[test]
    fn test_leading_drift_is_not_a_leg() {
        // 100 -> 104 never confirms; the first confirmed wave is the drop from 104
        let bars = bars_from(&[100.0, 104.0, 93.0, 105.0]);
        let waves = segment(&bars, 10.0);
        assert!(waves[0].leading);

        let legs = legs_from_waves(&waves);
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0].start_price, 93.0);
        assert_eq!(legs[0].status, LegStatus::Ongoing);
    }

    #[test]
    fn test_summary_falls_back_to_all_legs() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let ongoing = ReboundLeg::build(
            date,
            100.0,
            date + Duration::days(30),
            125.0,
            LegStatus::Ongoing,
        )
        .unwrap();
        let summary = summarize_legs(&[ongoing], &BucketEdges::gain_default());

        assert_eq!(summary.total_legs, 1);
        assert!((summary.avg_gain_pct - 25.0).abs() < 1e-9);
        assert_eq!(summary.prob_gain_ge_20_pct, 100.0);
        assert_eq!(summary.distribution[2].count, 1);
    }

    #[test]
    fn test_summary_empty() {
        let summary = summarize_legs(&[], &BucketEdges::gain_default());
        assert_eq!(summary.total_legs, 0);
        assert_eq!(summary.avg_gain_pct, 0.0);
        assert_eq!(summary.distribution.len(), 8);
    }
}
