// market-common/src/analysis/analyzers.rs
// Registry entries: each analyzer wires one scan to its summary

use tracing::info;

use super::base::{
    AnalysisReport, AnalysisSettings, Analyzer, DrawdownReport, ReboundReport, WaveReport,
};
use super::drawdown::DrawdownTracker;
use super::monitor::current_drawdown;
use super::rebound::{legs_from_drawdowns, legs_from_waves, summarize_legs};
use super::stats::summarize;
use super::wave::WaveSegmenter;
use crate::data::types::PriceBar;

pub struct WaveAnalyzer {
    settings: AnalysisSettings,
}

impl WaveAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }
}

impl Analyzer for WaveAnalyzer {
    fn id(&self) -> &str {
        "waves"
    }

    fn name(&self) -> &str {
        "Wave Segmentation"
    }

    fn analyze(&self, bars: &[PriceBar]) -> AnalysisReport {
        let waves = WaveSegmenter::new(self.settings.wave).segment(bars);
        let up_legs = legs_from_waves(&waves);
        let leg_summary = summarize_legs(&up_legs, &self.settings.gain_edges);
        let sealed_waves = waves.iter().filter(|w| !w.ongoing && !w.leading).count();

        info!("{}: {} waves ({} sealed)", self.name(), waves.len(), sealed_waves);

        AnalysisReport::Waves(WaveReport {
            reversal_pct: self.settings.wave.reversal_pct,
            waves,
            sealed_waves,
            up_legs,
            leg_summary,
        })
    }
}

pub struct DrawdownAnalyzer {
    settings: AnalysisSettings,
}

impl DrawdownAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }
}

impl Analyzer for DrawdownAnalyzer {
    fn id(&self) -> &str {
        "drawdown"
    }

    fn name(&self) -> &str {
        "Drawdown Events"
    }

    fn analyze(&self, bars: &[PriceBar]) -> AnalysisReport {
        let config = self.settings.drawdown;
        let events = DrawdownTracker::new(config).track(bars);
        let summary = summarize(&events, &self.settings.drawdown_edges);
        let status = current_drawdown(bars, &events, &summary, config.trigger_pct);

        info!(
            "{}: {} events, {} open",
            self.name(),
            summary.total_events,
            summary.open_events
        );

        AnalysisReport::Drawdown(DrawdownReport {
            trigger_pct: config.trigger_pct,
            recovery_target: config.recovery_target,
            events,
            summary,
            status,
        })
    }
}

pub struct ReboundAnalyzer {
    settings: AnalysisSettings,
}

impl ReboundAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Self {
        Self { settings }
    }
}

impl Analyzer for ReboundAnalyzer {
    fn id(&self) -> &str {
        "rebound"
    }

    fn name(&self) -> &str {
        "Rebound Legs"
    }

    fn analyze(&self, bars: &[PriceBar]) -> AnalysisReport {
        let events = DrawdownTracker::new(self.settings.drawdown).track(bars);
        let legs = legs_from_drawdowns(&events, bars);
        let summary = summarize_legs(&legs, &self.settings.gain_edges);

        info!("{}: {} legs", self.name(), legs.len());

        AnalysisReport::Rebound(ReboundReport {
            trigger_pct: self.settings.drawdown.trigger_pct,
            legs,
            summary,
        })
    }
}
