// market-core/src/config.rs
// Settings: defaults, optional config.toml, MARKET_* environment overrides

use chrono::NaiveDate;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use market_common::analysis::{
    AnalysisSettings, BucketEdges, DrawdownConfig, RecoveryTarget, WaveConfig,
};
use market_common::backtest::{BiasBacktestConfig, PeakSource};
use market_common::data::{DataResult, Timeframe};

#[derive(Debug, Deserialize, Clone)]
pub struct Provider {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub start_date: NaiveDate,
    pub interval: Timeframe,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Cache {
    pub ttl_seconds: u64,
    pub max_series: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Database {
    pub enabled: bool,
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Analysis {
    pub reversal_pct: f64,
    pub trigger_pct: f64,
    pub recovery_target: RecoveryTarget,
    pub drawdown_bucket_edges: Vec<f64>,
    pub gain_bucket_edges: Vec<f64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Bias {
    pub timeframe: Timeframe,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub ma_window: usize,
    pub regime_lookback: usize,
    pub regime_cutoff: f64,
    pub peak_source: PeakSource,
    pub odds_margin: f64,
    pub odds_horizon: usize,
    pub projection_periods: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub provider: Provider,
    pub cache: Cache,
    pub database: Database,
    pub analysis: Analysis,
    pub bias: Bias,
    pub symbols: Vec<String>,
}

impl Settings {
    /// Defaults, then `config.toml` (optional), then `MARKET_*` variables
    /// (`MARKET_ANALYSIS__TRIGGER_PCT=10`). A `.env` file is loaded first.
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::builder()?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("MARKET")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("symbols")
                    .with_list_parse_key("analysis.drawdown_bucket_edges")
                    .with_list_parse_key("analysis.gain_bucket_edges")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults only.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError>
    {
        Config::builder()
            .set_default("provider.base_url", "https://query1.finance.yahoo.com")?
            .set_default("provider.timeout_seconds", 30)?
            .set_default("provider.start_date", "2000-01-01")?
            .set_default("provider.interval", "daily")?
            .set_default("cache.ttl_seconds", 3600)?
            .set_default("cache.max_series", 64)?
            .set_default("database.enabled", false)?
            .set_default("database.url", "sqlite:data/market.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.min_connections", 1)?
            .set_default("analysis.reversal_pct", 7.0)?
            .set_default("analysis.trigger_pct", 7.0)?
            .set_default("analysis.recovery_target", "prior_high")?
            .set_default(
                "analysis.drawdown_bucket_edges",
                vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0],
            )?
            .set_default(
                "analysis.gain_bucket_edges",
                vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0],
            )?
            .set_default("bias.timeframe", "weekly")?
            .set_default("bias.entry_threshold", 22.0)?
            .set_default("bias.exit_threshold", 0.0)?
            .set_default("bias.ma_window", 40)?
            .set_default("bias.regime_lookback", 52)?
            .set_default("bias.regime_cutoff", -20.0)?
            .set_default("bias.peak_source", "close")?
            .set_default("bias.odds_margin", 2.0)?
            .set_default("bias.odds_horizon", 4)?
            .set_default("bias.projection_periods", 18)?
            .set_default("symbols", vec!["^GSPC", "^IXIC", "^TWII"])
    }

    pub fn get_db_url(&self) -> String {
        self.database.url.clone()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_seconds)
    }

    pub fn wave_config(&self) -> WaveConfig {
        WaveConfig::new(self.analysis.reversal_pct)
    }

    pub fn drawdown_config(&self) -> DrawdownConfig {
        DrawdownConfig::new(self.analysis.trigger_pct)
            .with_recovery_target(self.analysis.recovery_target)
    }

    pub fn bias_config(&self) -> BiasBacktestConfig {
        BiasBacktestConfig::default()
            .with_thresholds(self.bias.entry_threshold, self.bias.exit_threshold)
            .with_ma_window(self.bias.ma_window)
            .with_regime(self.bias.regime_lookback, self.bias.regime_cutoff)
            .with_peak_source(self.bias.peak_source)
    }

    /// Fails when either bucket edge list is empty or not increasing.
    pub fn analysis_settings(&self) -> DataResult<AnalysisSettings> {
        let drawdown_edges = BucketEdges::new(self.analysis.drawdown_bucket_edges.clone())?;
        let gain_edges = BucketEdges::new(self.analysis.gain_bucket_edges.clone())?;
        Ok(AnalysisSettings::default()
            .with_wave(self.wave_config())
            .with_drawdown(self.drawdown_config())
            .with_edges(drawdown_edges, gain_edges))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize() {
        let settings = Settings::defaults().unwrap();

        assert_eq!(settings.provider.interval, Timeframe::Daily);
        assert_eq!(
            settings.provider.start_date,
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
        );
        assert_eq!(settings.analysis.recovery_target, RecoveryTarget::PriorHigh);
        assert_eq!(settings.bias.peak_source, PeakSource::Close);
        assert_eq!(settings.bias.timeframe, Timeframe::Weekly);
        assert_eq!(settings.symbols, vec!["^GSPC", "^IXIC", "^TWII"]);
        assert_eq!(settings.cache_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_algorithm_configs_follow_settings() {
        let settings = Settings::defaults().unwrap();

        assert_eq!(settings.wave_config().reversal_pct, 7.0);
        let drawdown = settings.drawdown_config();
        assert_eq!(drawdown.trigger_pct, 7.0);
        assert_eq!(drawdown.recovery_target, RecoveryTarget::PriorHigh);

        let bias = settings.bias_config();
        assert_eq!(bias.entry_threshold, 22.0);
        assert_eq!(bias.ma_window, 40);
        assert_eq!(bias.regime_lookback, 52);

        let analysis = settings.analysis_settings().unwrap();
        assert_eq!(analysis.drawdown_edges.bucket_count(), 6);
        assert_eq!(analysis.gain_edges.bucket_count(), 8);
    }

    #[test]
    fn test_bad_edges_are_rejected() {
        let mut settings = Settings::defaults().unwrap();
        settings.analysis.drawdown_bucket_edges = vec![10.0, 5.0];
        assert!(settings.analysis_settings().is_err());
    }
}
