// market-common/src/analysis/wave.rs
// Wave segmentation: alternating up/down legs confirmed by a percentage reversal

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::types::{days_between, pct_change, PriceBar};

/// Relative slack so that a move of exactly the reversal percentage confirms.
const REVERSAL_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveType {
    Up,
    Down,
}

/// One monotonic leg between two reversal points.
///
/// `ongoing` waves have not been confirmed by a reversal; their end is the
/// provisional extreme observed so far. A `leading` wave runs from the first
/// bar to the extreme the first confirmed wave is measured from; it moved
/// less than the reversal threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub wave_type: WaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_price: f64,
    pub end_price: f64,
    pub ongoing: bool,
    #[serde(default)]
    pub leading: bool,
}

impl Wave {
    /// Signed move from start to end in percent.
    pub fn change_pct(&self) -> f64 {
        pct_change(self.start_price, self.end_price).unwrap_or(0.0)
    }

    pub fn days(&self) -> i64 {
        days_between(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WaveConfig {
    pub reversal_pct: f64,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self { reversal_pct: 10.0 }
    }
}

impl WaveConfig {
    pub fn new(reversal_pct: f64) -> Self {
        Self { reversal_pct }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TrendState {
    Undetermined,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy)]
struct Pivot {
    price: f64,
    date: NaiveDate,
}

impl Pivot {
    fn new(price: f64, date: NaiveDate) -> Self {
        Self { price, date }
    }
}

pub struct WaveSegmenter {
    config: WaveConfig,
}

impl WaveSegmenter {
    pub fn new(config: WaveConfig) -> Self {
        Self { config }
    }

    /// Single forward pass over `bars`.
    ///
    /// Before the first reversal both the running high and the running low
    /// are tracked; the first confirmed wave starts from whichever of them the
    /// move is measured against, so every confirmed wave spans at least
    /// `reversal_pct`. When that extreme is not the first bar, a `leading`
    /// wave covers the stretch from the first close to it.
    pub fn segment(&self, bars: &[PriceBar]) -> Vec<Wave> {
        let mut waves = Vec::new();
        let Some(first) = bars.first() else {
            return waves;
        };

        let up_factor = 1.0 + self.config.reversal_pct / 100.0;
        let down_factor = 1.0 - self.config.reversal_pct / 100.0;

        let origin = Pivot::new(first.close, first.date);
        let mut state = TrendState::Undetermined;
        let mut running_high = Pivot::new(first.close, first.date);
        let mut running_low = Pivot::new(first.close, first.date);
        let mut wave_start = Pivot::new(first.close, first.date);
        let mut extreme = Pivot::new(first.close, first.date);

        for bar in bars {
            match state {
                TrendState::Undetermined => {
                    if reaches_up(bar.high, running_low.price * up_factor) {
                        if running_low.date != origin.date {
                            waves.push(Self::leading(WaveType::Down, origin, running_low));
                        }
                        state = TrendState::Up;
                        wave_start = running_low;
                        extreme = Pivot::new(bar.high, bar.date);
                    } else if reaches_down(bar.low, running_high.price * down_factor) {
                        if running_high.date != origin.date {
                            waves.push(Self::leading(WaveType::Up, origin, running_high));
                        }
                        state = TrendState::Down;
                        wave_start = running_high;
                        extreme = Pivot::new(bar.low, bar.date);
                    } else {
                        if bar.high > running_high.price {
                            running_high = Pivot::new(bar.high, bar.date);
                        }
                        if bar.low < running_low.price {
                            running_low = Pivot::new(bar.low, bar.date);
                        }
                    }
                }
                TrendState::Up => {
                    if bar.high > extreme.price {
                        extreme = Pivot::new(bar.high, bar.date);
                    }
                    if reaches_down(bar.low, extreme.price * down_factor) {
                        waves.push(Self::seal(WaveType::Up, wave_start, extreme, false));
                        state = TrendState::Down;
                        wave_start = extreme;
                        extreme = Pivot::new(bar.low, bar.date);
                    }
                }
                TrendState::Down => {
                    if bar.low < extreme.price {
                        extreme = Pivot::new(bar.low, bar.date);
                    }
                    if reaches_up(bar.high, extreme.price * up_factor) {
                        waves.push(Self::seal(WaveType::Down, wave_start, extreme, false));
                        state = TrendState::Up;
                        wave_start = extreme;
                        extreme = Pivot::new(bar.high, bar.date);
                    }
                }
            }
        }

        let trailing = match state {
            TrendState::Up => Some(WaveType::Up),
            TrendState::Down => Some(WaveType::Down),
            TrendState::Undetermined => None,
        };
        if let Some(wave_type) = trailing {
            if wave_start.date != extreme.date {
                waves.push(Self::seal(wave_type, wave_start, extreme, true));
            }
        }

        debug!(
            "Segmented {} bars into {} waves (reversal {}%)",
            bars.len(),
            waves.len(),
            self.config.reversal_pct
        );
        waves
    }

    fn seal(wave_type: WaveType, start: Pivot, end: Pivot, ongoing: bool) -> Wave {
        Wave {
            wave_type,
            start_date: start.date,
            end_date: end.date,
            start_price: start.price,
            end_price: end.price,
            ongoing,
            leading: false,
        }
    }

    fn leading(wave_type: WaveType, origin: Pivot, extreme: Pivot) -> Wave {
        Wave {
            leading: true,
            ..Self::seal(wave_type, origin, extreme, false)
        }
    }
}

fn reaches_up(price: f64, target: f64) -> bool {
    price >= target * (1.0 - REVERSAL_TOLERANCE)
}

fn reaches_down(price: f64, target: f64) -> bool {
    price <= target * (1.0 + REVERSAL_TOLERANCE)
}

/// Segment with a one-off reversal threshold.
pub fn segment(bars: &[PriceBar], reversal_pct: f64) -> Vec<Wave> {
    WaveSegmenter::new(WaveConfig::new(reversal_pct)).segment(bars)
}
