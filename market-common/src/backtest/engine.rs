use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::indicators::{augment_with_bias, BiasBar};
use super::regime::{Regime, RegimeClassifier};
use crate::data::types::{days_between, EventStatus, PriceBar};

/// Which price the in-event peak follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakSource {
    Close,
    High,
}

impl PeakSource {
    fn price(&self, bar: &PriceBar) -> f64 {
        match self {
            PeakSource::Close => bar.close,
            PeakSource::High => bar.high,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BiasBacktestConfig {
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub ma_window: usize,
    pub regime_lookback: usize,
    pub regime_cutoff: f64,
    pub peak_source: PeakSource,
}

impl Default for BiasBacktestConfig {
    fn default() -> Self {
        Self {
            entry_threshold: 22.0,
            exit_threshold: 0.0,
            ma_window: 40,
            regime_lookback: 52,
            regime_cutoff: -20.0,
            peak_source: PeakSource::Close,
        }
    }
}

impl BiasBacktestConfig {
    pub fn with_thresholds(mut self, entry: f64, exit: f64) -> Self {
        self.entry_threshold = entry;
        self.exit_threshold = exit;
        self
    }

    pub fn with_ma_window(mut self, window: usize) -> Self {
        self.ma_window = window;
        self
    }

    pub fn with_regime(mut self, lookback: usize, cutoff: f64) -> Self {
        self.regime_lookback = lookback;
        self.regime_cutoff = cutoff;
        self
    }

    pub fn with_peak_source(mut self, source: PeakSource) -> Self {
        self.peak_source = source;
        self
    }

    fn classifier(&self) -> RegimeClassifier {
        RegimeClassifier::new(self.regime_lookback, self.regime_cutoff)
    }
}

/// One excursion of the bias above the entry threshold and back to the exit.
///
/// While `status` is `Open` the `return_*` fields and
/// `total_drawdown_from_peak_pct` are `None`, and `duration_days` runs to the
/// last bar of the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasRegimeEvent {
    pub trigger_date: NaiveDate,
    pub regime: Regime,
    pub trailing_max_drawdown_pct: f64,
    pub trigger_price: f64,
    pub trigger_bias_pct: f64,
    /// Price at which the bias equals the entry threshold on the trigger bar.
    pub warning_price: f64,
    pub peak_price: f64,
    pub peak_date: NaiveDate,
    pub peak_surge_pct: f64,
    pub return_date: Option<NaiveDate>,
    pub return_price: Option<f64>,
    /// Decline from peak to the return close, negative.
    pub total_drawdown_from_peak_pct: Option<f64>,
    pub duration_days: i64,
    pub status: EventStatus,
    pub degenerate: bool,
}

impl BiasRegimeEvent {
    pub fn duration_weeks(&self) -> i64 {
        self.duration_days / 7
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

struct ActiveExcursion {
    trigger_date: NaiveDate,
    regime: Regime,
    trailing_max_drawdown_pct: f64,
    trigger_price: f64,
    trigger_bias_pct: f64,
    warning_price: f64,
    peak_price: f64,
    peak_date: NaiveDate,
}

impl ActiveExcursion {
    fn finish(self, end_date: NaiveDate, exit: Option<f64>) -> BiasRegimeEvent {
        let degenerate = self.trigger_price <= 0.0 || self.peak_price <= 0.0;
        if degenerate {
            warn!(
                "Degenerate bias event reference at {} (trigger {}, peak {})",
                self.trigger_date, self.trigger_price, self.peak_price
            );
        }

        let peak_surge_pct = if degenerate {
            0.0
        } else {
            (self.peak_price - self.trigger_price) / self.trigger_price * 100.0
        };
        let total_drawdown_from_peak_pct = exit.map(|price| {
            if degenerate {
                0.0
            } else {
                (price - self.peak_price) / self.peak_price * 100.0
            }
        });
        let (status, return_date) = match exit {
            Some(_) => (EventStatus::Recovered, Some(end_date)),
            None => (EventStatus::Open, None),
        };

        BiasRegimeEvent {
            trigger_date: self.trigger_date,
            regime: self.regime,
            trailing_max_drawdown_pct: self.trailing_max_drawdown_pct,
            trigger_price: self.trigger_price,
            trigger_bias_pct: self.trigger_bias_pct,
            warning_price: self.warning_price,
            peak_price: self.peak_price,
            peak_date: self.peak_date,
            peak_surge_pct,
            return_date,
            return_price: exit,
            total_drawdown_from_peak_pct,
            duration_days: days_between(self.trigger_date, end_date),
            status,
            degenerate,
        }
    }
}

pub struct BiasBacktester {
    config: BiasBacktestConfig,
}

impl BiasBacktester {
    pub fn new(config: BiasBacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BiasBacktestConfig {
        &self.config
    }

    /// Augment raw bars with the configured moving average, then run.
    pub fn run_on_prices(&self, bars: &[PriceBar]) -> (Vec<BiasBar>, Vec<BiasRegimeEvent>) {
        let augmented = augment_with_bias(bars, self.config.ma_window);
        let events = self.run(&augmented);
        (augmented, events)
    }

    /// Bars without a bias (moving-average warm-up) are skipped.
    pub fn run(&self, bars: &[BiasBar]) -> Vec<BiasRegimeEvent> {
        let classifier = self.config.classifier();
        let source = self.config.peak_source;
        let mut events = Vec::new();
        let mut active: Option<ActiveExcursion> = None;
        let mut skipped = 0usize;

        for (index, b) in bars.iter().enumerate() {
            let (Some(bias), Some(average)) = (b.bias_pct, b.moving_average) else {
                skipped += 1;
                continue;
            };

            match active.as_mut() {
                None => {
                    if bias > self.config.entry_threshold {
                        let reading = classifier.classify_at(bars, index);
                        debug!(
                            "Bias trigger at {}: {:.2}% ({})",
                            b.bar.date,
                            bias,
                            reading.regime.label()
                        );
                        active = Some(ActiveExcursion {
                            trigger_date: b.bar.date,
                            regime: reading.regime,
                            trailing_max_drawdown_pct: reading.trailing_max_drawdown_pct,
                            trigger_price: b.bar.close,
                            trigger_bias_pct: bias,
                            warning_price: average * (1.0 + self.config.entry_threshold / 100.0),
                            peak_price: source.price(&b.bar),
                            peak_date: b.bar.date,
                        });
                    }
                }
                Some(excursion) => {
                    let price = source.price(&b.bar);
                    if price > excursion.peak_price {
                        excursion.peak_price = price;
                        excursion.peak_date = b.bar.date;
                    }
                    if bias <= self.config.exit_threshold {
                        if let Some(excursion) = active.take() {
                            events.push(excursion.finish(b.bar.date, Some(b.bar.close)));
                        }
                    }
                }
            }
        }

        if let (Some(excursion), Some(last)) = (active, bars.last()) {
            events.push(excursion.finish(last.bar.date, None));
        }

        info!(
            "Bias backtest: {} events over {} bars ({} warm-up bars skipped)",
            events.len(),
            bars.len(),
            skipped
        );
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bars_from(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(start + Duration::weeks(i as i64), c, c * 1.01, c, c))
            .collect()
    }

    fn short_window() -> BiasBacktestConfig {
        BiasBacktestConfig::default().with_ma_window(2)
    }

    #[test]
    fn test_empty_and_warmup_only() {
        let backtester = BiasBacktester::new(BiasBacktestConfig::default());
        assert!(backtester.run(&[]).is_empty());
        let (augmented, events) = backtester.run_on_prices(&bars_from(&[100.0; 10]));
        assert_eq!(augmented.len(), 10);
        assert!(events.is_empty());
    }

    #[test]
    fn test_trigger_peak_and_return() {
        // window 2: bias = (c - p) / (c + p), so 100 -> 200 is 33.3%
        let closes = [100.0, 100.0, 200.0, 220.0, 210.0, 150.0];
        let bars = bars_from(&closes);
        let backtester = BiasBacktester::new(short_window().with_thresholds(22.0, 0.0));
        let (_, events) = backtester.run_on_prices(&bars);

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.trigger_date, bars[2].date);
        assert_eq!(event.trigger_price, 200.0);
        assert!((event.trigger_bias_pct - 100.0 / 3.0).abs() < 1e-9);
        assert!((event.warning_price - 150.0 * 1.22).abs() < 1e-9);
        assert_eq!(event.peak_price, 220.0);
        assert_eq!(event.peak_date, bars[3].date);
        assert!((event.peak_surge_pct - 10.0).abs() < 1e-9);

        assert_eq!(event.status, EventStatus::Recovered);
        assert_eq!(event.return_date, Some(bars[4].date));
        assert_eq!(event.return_price, Some(210.0));
        let expected = (210.0 - 220.0) / 220.0 * 100.0;
        assert!((event.total_drawdown_from_peak_pct.unwrap() - expected).abs() < 1e-9);
        assert_eq!(event.duration_days, 14);
        assert_eq!(event.duration_weeks(), 2);
        assert_eq!(event.regime, Regime::HighExtension);
    }

    #[test]
    fn test_peak_source_high() {
        let closes = [100.0, 100.0, 200.0, 220.0, 210.0];
        let backtester = BiasBacktester::new(short_window().with_peak_source(PeakSource::High));
        let (_, events) = backtester.run_on_prices(&bars_from(&closes));

        assert!((events[0].peak_price - 220.0 * 1.01).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_peak_is_degenerate() {
        let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let bar = |week: i64, close: f64, bias: f64| BiasBar {
            bar: PriceBar::new(start + Duration::weeks(week), close, 0.0, close, close),
            moving_average: Some(100.0),
            bias_pct: Some(bias),
        };
        let bars = [bar(0, 130.0, 30.0), bar(1, 95.0, -5.0)];
        let backtester = BiasBacktester::new(short_window().with_peak_source(PeakSource::High));
        let events = backtester.run(&bars);

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert!(event.degenerate);
        assert_eq!(event.peak_price, 0.0);
        assert_eq!(event.peak_surge_pct, 0.0);
        assert_eq!(event.total_drawdown_from_peak_pct, Some(0.0));
        assert_eq!(event.status, EventStatus::Recovered);
        assert_eq!(event.return_date, Some(bars[1].date()));
        assert!(event.return_date > Some(event.trigger_date));
        assert_eq!(event.regime, Regime::Unknown);
    }

    #[test]
    fn test_well_formed_event_is_not_degenerate() {
        let closes = [100.0, 100.0, 200.0, 220.0, 210.0];
        let (_, events) = BiasBacktester::new(short_window()).run_on_prices(&bars_from(&closes));
        assert!(!events[0].degenerate);
    }

    #[test]
    fn test_unfinished_excursion_is_open() {
        let closes = [100.0, 100.0, 200.0, 220.0, 230.0];
        let backtester = BiasBacktester::new(short_window());
        let (_, events) = backtester.run_on_prices(&bars_from(&closes));

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert!(event.is_open());
        assert_eq!(event.return_date, None);
        assert_eq!(event.return_price, None);
        assert_eq!(event.total_drawdown_from_peak_pct, None);
        assert_eq!(event.duration_days, 14);
        assert_eq!(event.peak_price, 230.0);
    }

    #[test]
    fn test_low_base_regime_after_crash() {
        let closes = [100.0, 70.0, 70.0, 70.0, 115.0, 100.0];
        let backtester = BiasBacktester::new(short_window());
        let (_, events) = backtester.run_on_prices(&bars_from(&closes));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].regime, Regime::LowBaseRebound);
        assert!(events[0].trailing_max_drawdown_pct <= -20.0);
        assert_eq!(events[0].status, EventStatus::Recovered);
    }
}
