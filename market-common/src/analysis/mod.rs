pub(crate) mod analyzers;
pub mod base;
pub mod drawdown;
pub mod monitor;
pub mod performance;
pub mod rebound;
pub mod stats;
pub mod wave;

use analyzers::{DrawdownAnalyzer, ReboundAnalyzer, WaveAnalyzer};
pub use base::{
    AnalysisReport, AnalysisSettings, Analyzer, DrawdownReport, ReboundReport, WaveReport,
};
pub use drawdown::{DrawdownConfig, DrawdownEvent, DrawdownTracker, RecoveryTarget};
pub use monitor::{current_drawdown, DrawdownStatus};
pub use performance::{buy_and_hold_curve, growth_curve, PerformanceMetrics};
pub use rebound::{legs_from_drawdowns, legs_from_waves, summarize_legs, LegStatus, LegSummary, ReboundLeg};
pub use stats::{distribution, summarize, BucketEdges, DistributionBucket, DrawdownSummary};
pub use wave::{Wave, WaveConfig, WaveSegmenter, WaveType};

#[derive(Debug, Clone)]
pub struct AnalyzerInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

pub fn create_analyzer(
    analyzer_id: &str,
    settings: &AnalysisSettings,
) -> Result<Box<dyn Analyzer>, String> {
    match analyzer_id {
        "waves" => Ok(Box::new(WaveAnalyzer::new(settings.clone()))),
        "drawdown" => Ok(Box::new(DrawdownAnalyzer::new(settings.clone()))),
        "rebound" => Ok(Box::new(ReboundAnalyzer::new(settings.clone()))),
        _ => Err(format!("Unknown analyzer: {}", analyzer_id)),
    }
}

pub fn list_analyzers() -> Vec<AnalyzerInfo> {
    vec![
        AnalyzerInfo {
            id: "waves".to_string(),
            name: "Wave Segmentation".to_string(),
            description: "Alternating up/down legs confirmed by a percentage reversal".to_string(),
        },
        AnalyzerInfo {
            id: "drawdown".to_string(),
            name: "Drawdown Events".to_string(),
            description: "Closes a threshold below the rolling high, tracked to bottom and recovery"
                .to_string(),
        },
        AnalyzerInfo {
            id: "rebound".to_string(),
            name: "Rebound Legs".to_string(),
            description: "Gains from each drawdown bottom to the next sell-off".to_string(),
        },
    ]
}

pub fn get_analyzer_info(analyzer_id: &str) -> Option<AnalyzerInfo> {
    list_analyzers()
        .into_iter()
        .find(|info| info.id == analyzer_id)
}
