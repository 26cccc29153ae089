use serde::{Deserialize, Serialize};

use super::indicators::BiasBar;

/// Historical outcome for bars whose bias was close to the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasOdds {
    pub current_bias_pct: f64,
    pub margin: f64,
    pub horizon: usize,
    /// Bars in the bias band that have a bar `horizon` periods later.
    pub samples: usize,
    pub declines: usize,
    /// `None` means not enough history.
    pub decline_probability_pct: Option<f64>,
}

/// Share of similar-bias bars whose close was lower `horizon` bars later.
pub fn bias_odds(bars: &[BiasBar], current_bias_pct: f64, margin: f64, horizon: usize) -> BiasOdds {
    let low = current_bias_pct - margin;
    let high = current_bias_pct + margin;

    let (samples, declines) = bars
        .iter()
        .enumerate()
        .filter(|(_, b)| b.bias_pct.is_some_and(|bias| bias >= low && bias <= high))
        .filter_map(|(i, b)| bars.get(i + horizon).map(|future| (b, future)))
        .fold((0usize, 0usize), |(n, down), (now, future)| {
            let declined = future.bar.close < now.bar.close;
            (n + 1, down + usize::from(declined))
        });

    BiasOdds {
        current_bias_pct,
        margin,
        horizon,
        samples,
        declines,
        decline_probability_pct: (samples > 0)
            .then(|| declines as f64 / samples as f64 * 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn biased(points: &[(f64, Option<f64>)]) -> Vec<BiasBar> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 6).unwrap();
        points
            .iter()
            .enumerate()
            .map(|(i, &(close, bias))| BiasBar {
                bar: PriceBar::new(start + Duration::weeks(i as i64), close, close, close, close),
                moving_average: bias.map(|_| close),
                bias_pct: bias,
            })
            .collect()
    }

    #[test]
    fn test_counts_declines_within_band() {
        let bars = biased(&[
            (100.0, Some(20.0)),
            (110.0, Some(25.0)),
            (105.0, Some(21.5)),
            (90.0, Some(0.0)),
            (95.0, Some(1.0)),
            (120.0, Some(5.0)),
        ]);
        let odds = bias_odds(&bars, 21.0, 2.0, 2);

        // Samples: index 0 (100 -> 105, up) and index 2 (105 -> 95, down)
        assert_eq!(odds.samples, 2);
        assert_eq!(odds.declines, 1);
        assert_eq!(odds.decline_probability_pct, Some(50.0));
    }

    #[test]
    fn test_insufficient_history() {
        let bars = biased(&[(100.0, None), (110.0, Some(22.0))]);
        let odds = bias_odds(&bars, 22.0, 2.0, 4);
        assert_eq!(odds.samples, 0);
        assert_eq!(odds.decline_probability_pct, None);
        assert_eq!(bias_odds(&[], 0.0, 2.0, 4).decline_probability_pct, None);
    }
}
