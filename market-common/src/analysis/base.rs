use serde::{Deserialize, Serialize};

use super::drawdown::{DrawdownConfig, DrawdownEvent, RecoveryTarget};
use super::monitor::DrawdownStatus;
use super::rebound::{LegSummary, ReboundLeg};
use super::stats::{BucketEdges, DrawdownSummary};
use super::wave::{Wave, WaveConfig};
use crate::data::types::{DataResult, PriceBar};

/// Everything an analyzer needs besides the bars themselves.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub wave: WaveConfig,
    pub drawdown: DrawdownConfig,
    pub drawdown_edges: BucketEdges,
    pub gain_edges: BucketEdges,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            wave: WaveConfig::default(),
            drawdown: DrawdownConfig::default(),
            drawdown_edges: BucketEdges::drawdown_default(),
            gain_edges: BucketEdges::gain_default(),
        }
    }
}

impl AnalysisSettings {
    pub fn with_wave(mut self, wave: WaveConfig) -> Self {
        self.wave = wave;
        self
    }

    pub fn with_drawdown(mut self, drawdown: DrawdownConfig) -> Self {
        self.drawdown = drawdown;
        self
    }

    pub fn with_edges(mut self, drawdown_edges: BucketEdges, gain_edges: BucketEdges) -> Self {
        self.drawdown_edges = drawdown_edges;
        self.gain_edges = gain_edges;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveReport {
    pub reversal_pct: f64,
    pub waves: Vec<Wave>,
    pub sealed_waves: usize,
    pub up_legs: Vec<ReboundLeg>,
    pub leg_summary: LegSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownReport {
    pub trigger_pct: f64,
    pub recovery_target: RecoveryTarget,
    pub events: Vec<DrawdownEvent>,
    pub summary: DrawdownSummary,
    /// `None` for an empty series.
    pub status: Option<DrawdownStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReboundReport {
    pub trigger_pct: f64,
    pub legs: Vec<ReboundLeg>,
    pub summary: LegSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "analyzer", rename_all = "lowercase")]
pub enum AnalysisReport {
    Waves(WaveReport),
    Drawdown(DrawdownReport),
    Rebound(ReboundReport),
}

impl AnalysisReport {
    pub fn to_json(&self) -> DataResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// True when the report has nothing to show (empty or too short series).
    pub fn is_empty(&self) -> bool {
        match self {
            AnalysisReport::Waves(r) => r.waves.is_empty(),
            AnalysisReport::Drawdown(r) => r.events.is_empty() && r.status.is_none(),
            AnalysisReport::Rebound(r) => r.legs.is_empty(),
        }
    }
}

pub trait Analyzer: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn analyze(&self, bars: &[PriceBar]) -> AnalysisReport;
}
