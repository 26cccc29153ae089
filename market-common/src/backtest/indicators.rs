use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::data::types::PriceBar;

/// A price bar with its trailing moving average and bias.
///
/// Both are `None` until `window` closes are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasBar {
    pub bar: PriceBar,
    pub moving_average: Option<f64>,
    pub bias_pct: Option<f64>,
}

impl BiasBar {
    pub fn date(&self) -> NaiveDate {
        self.bar.date
    }
}

/// Trailing simple moving average, aligned with `values`.
pub fn simple_moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Attach the `window`-period close SMA and `bias = (close - sma) / sma * 100`.
pub fn augment_with_bias(bars: &[PriceBar], window: usize) -> Vec<BiasBar> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    simple_moving_average(&closes, window)
        .into_iter()
        .zip(bars)
        .map(|(moving_average, bar)| {
            let bias_pct = moving_average
                .filter(|ma| *ma > 0.0)
                .map(|ma| (bar.close - ma) / ma * 100.0);
            BiasBar {
                bar: *bar,
                moving_average,
                bias_pct,
            }
        })
        .collect()
}

/// Projected moving-average path if price stays flat at the last close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageProjection {
    pub assumed_close: f64,
    pub points: Vec<(NaiveDate, f64)>,
}

impl MovingAverageProjection {
    /// Final projected average and its date.
    pub fn target(&self) -> Option<(NaiveDate, f64)> {
        self.points.last().copied()
    }
}

/// Roll the SMA forward `periods` steps of `step_days`, feeding the last close.
///
/// Empty when fewer than `window - 1` historical closes exist.
pub fn project_moving_average(
    closes: &[f64],
    last_date: NaiveDate,
    window: usize,
    periods: usize,
    step_days: i64,
) -> MovingAverageProjection {
    let Some(&assumed_close) = closes.last() else {
        return MovingAverageProjection {
            assumed_close: 0.0,
            points: Vec::new(),
        };
    };
    if window == 0 || closes.len() + 1 < window {
        return MovingAverageProjection {
            assumed_close,
            points: Vec::new(),
        };
    }

    let mut series: Vec<f64> = closes.to_vec();
    let mut points = Vec::with_capacity(periods);
    for step in 1..=periods {
        series.push(assumed_close);
        let tail = &series[series.len() - window..];
        let average = tail.iter().sum::<f64>() / window as f64;
        points.push((last_date + Duration::days(step_days * step as i64), average));
    }

    MovingAverageProjection {
        assumed_close,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars_from(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2019, 1, 7).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(start + Duration::weeks(i as i64), c, c, c, c))
            .collect()
    }

    #[test]
    fn test_sma_warmup_and_values() {
        let sma = simple_moving_average(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(sma, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
        assert!(simple_moving_average(&[1.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn test_bias_undefined_before_window() {
        let augmented = augment_with_bias(&bars_from(&[100.0, 100.0, 130.0]), 3);
        assert_eq!(augmented[0].bias_pct, None);
        assert_eq!(augmented[1].bias_pct, None);
        assert_eq!(augmented[2].moving_average, Some(110.0));
        let bias = augmented[2].bias_pct.unwrap();
        assert!((bias - 20.0 / 110.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_converges_to_flat_close() {
        let closes = [100.0, 110.0, 120.0, 130.0];
        let last = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let projection = project_moving_average(&closes, last, 4, 5, 7);

        assert_eq!(projection.points.len(), 5);
        assert_eq!(projection.points[0].0, last + Duration::days(7));
        assert!((projection.points[0].1 - 122.5).abs() < 1e-9);
        let (date, value) = projection.target().unwrap();
        assert_eq!(date, last + Duration::days(35));
        assert!((value - 130.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_needs_history() {
        let last = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert!(project_moving_average(&[1.0, 2.0], last, 4, 3, 7).points.is_empty());
        assert_eq!(project_moving_average(&[1.0, 2.0, 3.0], last, 4, 3, 7).points.len(), 3);
        assert!(project_moving_average(&[], last, 4, 3, 7).target().is_none());
    }
}
