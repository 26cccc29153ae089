// market-common/src/analysis/drawdown.rs
// Drawdown event tracking: trigger below the rolling high, bottom, recovery

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::types::{days_between, EventStatus, PriceBar};

/// Price level a drawdown event has to regain before it is sealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryTarget {
    /// Full recovery: a bar's high reaches the prior high again.
    PriorHigh,
    /// Breakeven: a bar's high reaches the triggering close again.
    TriggerPrice,
}

impl RecoveryTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryTarget::PriorHigh => "prior_high",
            RecoveryTarget::TriggerPrice => "trigger_price",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DrawdownConfig {
    pub trigger_pct: f64,
    pub recovery_target: RecoveryTarget,
}

impl Default for DrawdownConfig {
    fn default() -> Self {
        Self {
            trigger_pct: 7.0,
            recovery_target: RecoveryTarget::PriorHigh,
        }
    }
}

impl DrawdownConfig {
    pub fn new(trigger_pct: f64) -> Self {
        Self {
            trigger_pct,
            ..Self::default()
        }
    }

    pub fn with_recovery_target(mut self, target: RecoveryTarget) -> Self {
        self.recovery_target = target;
        self
    }
}

/// One tracked drawdown episode.
///
/// For `Open` events `recovery_date` / `recovery_price` are `None` and
/// `days_to_recovery_or_elapsed` counts up to the last bar of the series.
/// `degenerate` marks events whose reference prices were not positive; their
/// percentages are zero rather than the result of a division by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownEvent {
    pub trigger_date: NaiveDate,
    pub trigger_price: f64,
    pub prior_high: f64,
    pub prior_high_date: NaiveDate,
    pub bottom_price: f64,
    pub bottom_date: NaiveDate,
    pub recovery_date: Option<NaiveDate>,
    pub recovery_price: Option<f64>,
    pub status: EventStatus,
    pub max_drawdown_pct: f64,
    pub residual_drawdown_pct: f64,
    pub days_to_bottom: i64,
    pub days_to_recovery_or_elapsed: i64,
    pub degenerate: bool,
}

impl DrawdownEvent {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// Event being tracked between trigger and recovery.
struct ActiveDrawdown {
    trigger_date: NaiveDate,
    trigger_price: f64,
    prior_high: f64,
    prior_high_date: NaiveDate,
    bottom_price: f64,
    bottom_date: NaiveDate,
}

impl ActiveDrawdown {
    fn recovery_level(&self, target: RecoveryTarget) -> f64 {
        match target {
            RecoveryTarget::PriorHigh => self.prior_high,
            RecoveryTarget::TriggerPrice => self.trigger_price,
        }
    }

    fn finish(
        self,
        status: EventStatus,
        end_date: NaiveDate,
        recovery_price: Option<f64>,
    ) -> DrawdownEvent {
        let degenerate = self.prior_high <= 0.0 || self.trigger_price <= 0.0;
        let (max_drawdown_pct, residual_drawdown_pct) = if degenerate {
            warn!(
                "Degenerate drawdown reference at {} (prior high {}, trigger {})",
                self.trigger_date, self.prior_high, self.trigger_price
            );
            (0.0, 0.0)
        } else {
            (
                (self.prior_high - self.bottom_price) / self.prior_high * 100.0,
                (self.trigger_price - self.bottom_price) / self.trigger_price * 100.0,
            )
        };

        let recovery_date = match status {
            EventStatus::Recovered => Some(end_date),
            EventStatus::Open => None,
        };

        DrawdownEvent {
            trigger_date: self.trigger_date,
            trigger_price: self.trigger_price,
            prior_high: self.prior_high,
            prior_high_date: self.prior_high_date,
            bottom_price: self.bottom_price,
            bottom_date: self.bottom_date,
            recovery_date,
            recovery_price,
            status,
            max_drawdown_pct,
            residual_drawdown_pct,
            days_to_bottom: days_between(self.trigger_date, self.bottom_date),
            days_to_recovery_or_elapsed: days_between(self.trigger_date, end_date),
            degenerate,
        }
    }
}

pub struct DrawdownTracker {
    config: DrawdownConfig,
}

impl DrawdownTracker {
    pub fn new(config: DrawdownConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DrawdownConfig {
        &self.config
    }

    /// Single forward pass. At most one event is open, and only the last.
    pub fn track(&self, bars: &[PriceBar]) -> Vec<DrawdownEvent> {
        let mut events = Vec::new();
        let Some(first) = bars.first() else {
            return events;
        };

        let mut rolling_high = first.high;
        let mut rolling_high_date = first.date;
        let mut active: Option<ActiveDrawdown> = None;

        for bar in bars {
            match active.as_mut() {
                None => {
                    if bar.high >= rolling_high {
                        rolling_high = bar.high;
                        rolling_high_date = bar.date;
                    }
                    if rolling_high <= 0.0 {
                        continue;
                    }

                    let drawdown = (rolling_high - bar.close) / rolling_high * 100.0;
                    if drawdown >= self.config.trigger_pct {
                        debug!(
                            "Drawdown trigger at {}: close {} is {:.2}% below {}",
                            bar.date, bar.close, drawdown, rolling_high
                        );
                        active = Some(ActiveDrawdown {
                            trigger_date: bar.date,
                            trigger_price: bar.close,
                            prior_high: rolling_high,
                            prior_high_date: rolling_high_date,
                            bottom_price: bar.low.min(bar.close),
                            bottom_date: bar.date,
                        });
                    }
                }
                Some(event) => {
                    if bar.low < event.bottom_price {
                        event.bottom_price = bar.low;
                        event.bottom_date = bar.date;
                    }

                    let level = event.recovery_level(self.config.recovery_target);
                    if bar.high >= level {
                        if let Some(event) = active.take() {
                            events.push(event.finish(EventStatus::Recovered, bar.date, Some(level)));
                        }
                        rolling_high = bar.high;
                        rolling_high_date = bar.date;
                    }
                }
            }
        }

        if let (Some(event), Some(last)) = (active, bars.last()) {
            events.push(event.finish(EventStatus::Open, last.date, None));
        }

        debug!(
            "Tracked {} drawdown events over {} bars (trigger {}%, target {})",
            events.len(),
            bars.len(),
            self.config.trigger_pct,
            self.config.recovery_target.as_str()
        );
        events
    }
}

/// Track with a one-off trigger and the default full-recovery target.
pub fn track(bars: &[PriceBar], trigger_pct: f64) -> Vec<DrawdownEvent> {
    DrawdownTracker::new(DrawdownConfig::new(trigger_pct)).track(bars)
}

/// The still unresolved event, if the series ends inside one.
pub fn open_event(events: &[DrawdownEvent]) -> Option<&DrawdownEvent> {
    events.last().filter(|e| e.is_open())
}
