// service/dashboard.rs
// Provider -> cache -> analytics wiring behind every dashboard page

use std::sync::Arc;
use tracing::{info, warn};

use super::errors::ServiceError;
use super::reports::{BiasReport, Holding, PortfolioReport};
use super::session::SessionContext;
use crate::config::Settings;
use crate::provider::{validate_symbol, PriceProvider};
use market_common::analysis::{
    buy_and_hold_curve, create_analyzer, AnalysisReport, AnalysisSettings, PerformanceMetrics,
};
use market_common::backtest::{bias_odds, project_moving_average, BiasBacktester};
use market_common::data::types::validate_series;
use market_common::data::{BarRepository, PriceBar, SeriesCache, SeriesKey, Timeframe};

const WEIGHT_TOLERANCE: f64 = 1e-6;

pub struct DashboardService {
    provider: Arc<dyn PriceProvider>,
    cache: SeriesCache,
    repository: Option<BarRepository>,
    settings: Settings,
    analysis: AnalysisSettings,
}

impl DashboardService {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        cache: SeriesCache,
        settings: Settings,
    ) -> Result<Self, ServiceError> {
        let analysis = settings.analysis_settings()?;
        Ok(Self {
            provider,
            cache,
            repository: None,
            settings,
            analysis,
        })
    }

    /// Persist fetched bars and fall back to them when the provider fails.
    pub fn with_repository(mut self, repository: BarRepository) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    // ====================================================================
    // SERIES
    // ====================================================================

    pub async fn load_series(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Arc<Vec<PriceBar>>, ServiceError> {
        let symbol = validate_symbol(symbol)?;
        let start = self.settings.provider.start_date;
        let key = SeriesKey::new(&symbol, timeframe, start);

        if let Some(bars) = self.cache.get(&key).await {
            return Ok(bars);
        }

        match self.provider.fetch_series(&symbol, start, timeframe).await {
            Ok(bars) => {
                validate_series(&bars)?;
                if let Some(repo) = &self.repository {
                    if let Err(e) = repo.upsert_bars(&symbol, timeframe, &bars).await {
                        warn!("Could not persist {} bars: {}", symbol, e);
                    }
                }
                Ok(self.cache.insert(key, bars).await)
            }
            Err(err) => {
                if let Some(repo) = &self.repository {
                    match repo.load_bars(&symbol, timeframe, Some(start)).await {
                        Ok(stored) if !stored.is_empty() => {
                            validate_series(&stored)?;
                            warn!(
                                "Provider failed for {} ({}), using {} stored bars",
                                symbol,
                                err,
                                stored.len()
                            );
                            return Ok(self.cache.insert(key, stored).await);
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Stored bars for {} unavailable: {}", symbol, e),
                    }
                }
                Err(err.into())
            }
        }
    }

    // ====================================================================
    // PAGES
    // ====================================================================

    /// Run one registered analyzer on the configured interval.
    pub async fn analyze(
        &self,
        ctx: &mut SessionContext,
        symbol: &str,
        analyzer_id: &str,
    ) -> Result<AnalysisReport, ServiceError> {
        ctx.record_visit(analyzer_id);
        let analyzer = create_analyzer(analyzer_id, &self.analysis).map_err(ServiceError::Config)?;
        let bars = self
            .load_series(symbol, self.settings.provider.interval)
            .await?;

        info!("{} on {} ({} bars)", analyzer.name(), symbol, bars.len());
        Ok(analyzer.analyze(&bars))
    }

    pub async fn bias_report(
        &self,
        ctx: &mut SessionContext,
        symbol: &str,
    ) -> Result<BiasReport, ServiceError> {
        ctx.record_visit("bias");
        let timeframe = self.settings.bias.timeframe;
        let bars = self.load_series(symbol, timeframe).await?;
        let config = self.settings.bias_config();

        let Some(last) = bars.last().filter(|_| bars.len() >= config.ma_window) else {
            return Err(ServiceError::InsufficientHistory {
                symbol: symbol.to_string(),
                required: config.ma_window,
                available: bars.len(),
            });
        };

        let (augmented, events) = BiasBacktester::new(config).run_on_prices(&bars);
        let latest = augmented.last();
        let moving_average = latest.and_then(|b| b.moving_average);
        let bias_pct = latest.and_then(|b| b.bias_pct);

        let odds = bias_pct.map(|bias| {
            bias_odds(
                &augmented,
                bias,
                self.settings.bias.odds_margin,
                self.settings.bias.odds_horizon,
            )
        });

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let projection = project_moving_average(
            &closes,
            last.date,
            config.ma_window,
            self.settings.bias.projection_periods,
            timeframe.step_days(),
        );

        let current_regime = events.last().filter(|e| e.is_open()).map(|e| e.regime);

        Ok(BiasReport {
            symbol: symbol.to_string(),
            as_of: last.date,
            last_close: last.close,
            moving_average,
            bias_pct,
            current_regime,
            events,
            odds,
            projection,
        })
    }

    /// Buy-and-hold metrics for weighted holdings against a benchmark.
    pub async fn portfolio_report(
        &self,
        ctx: &mut SessionContext,
        holdings: &[Holding],
        benchmark_symbol: &str,
        start_balance: f64,
    ) -> Result<PortfolioReport, ServiceError> {
        ctx.record_visit("portfolio");

        if holdings.is_empty() {
            return Err(ServiceError::Config("Portfolio has no holdings".to_string()));
        }
        let total_weight: f64 = holdings.iter().map(|h| h.weight).sum();
        if holdings.iter().any(|h| h.weight <= 0.0) || (total_weight - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ServiceError::Config(format!(
                "Weights must be positive and sum to 100% (got {:.2}%)",
                total_weight * 100.0
            )));
        }

        let mut series = Vec::with_capacity(holdings.len());
        for holding in holdings {
            series.push(self.load_series(&holding.symbol, Timeframe::Daily).await?);
        }
        let weighted: Vec<(f64, &[PriceBar])> = holdings
            .iter()
            .zip(&series)
            .map(|(h, bars)| (h.weight, bars.as_slice()))
            .collect();
        let curve = buy_and_hold_curve(&weighted);

        let (Some(&(first_date, _)), Some(&(last_date, _))) = (curve.first(), curve.last()) else {
            return Err(ServiceError::InsufficientHistory {
                symbol: holdings
                    .iter()
                    .map(|h| h.symbol.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                required: 1,
                available: 0,
            });
        };
        let portfolio = PerformanceMetrics::from_curve(&curve, start_balance).ok_or_else(|| {
            ServiceError::Config("Portfolio curve has no positive start value".to_string())
        })?;

        let benchmark_bars = self.load_series(benchmark_symbol, Timeframe::Daily).await?;
        let benchmark_window: Vec<PriceBar> = benchmark_bars
            .iter()
            .filter(|b| b.date >= first_date && b.date <= last_date)
            .copied()
            .collect();
        let benchmark_curve = buy_and_hold_curve(&[(1.0, benchmark_window.as_slice())]);
        let benchmark = PerformanceMetrics::from_curve(&benchmark_curve, start_balance);

        Ok(PortfolioReport {
            holdings: holdings.to_vec(),
            start_balance,
            first_date,
            last_date,
            portfolio,
            benchmark_symbol: benchmark_symbol.to_string(),
            benchmark,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use async_trait::async_trait;
    use market_common::data::DataError;
    use chrono::{Duration, NaiveDate};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        closes: Vec<f64>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(closes: Vec<f64>) -> Self {
            Self {
                closes,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                closes: Vec::new(),
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PriceProvider for StubProvider {
        async fn fetch_series(
            &self,
            symbol: &str,
            start: NaiveDate,
            timeframe: Timeframe,
        ) -> Result<Vec<PriceBar>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::Network(format!("{} unreachable", symbol)));
            }
            Ok(self
                .closes
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    let date = start + Duration::days(timeframe.step_days() * i as i64);
                    PriceBar::new(date, c, c, c, c)
                })
                .collect())
        }
    }

    fn service(provider: Arc<StubProvider>) -> DashboardService {
        let settings = Settings::defaults().unwrap();
        let cache = SeriesCache::new(settings.cache_ttl(), settings.cache.max_series);
        DashboardService::new(provider, cache, settings).unwrap()
    }

    fn rise_fall_recover() -> Vec<f64> {
        let mut closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        closes.extend((1..=10).map(|i| 109.0 - 1.5 * i as f64));
        closes.extend((1..=10).map(|i| 94.0 + 2.0 * i as f64));
        closes
    }

    #[tokio::test]
    async fn test_series_is_cached() {
        let provider = Arc::new(StubProvider::new(vec![100.0, 101.0]));
        let service = service(Arc::clone(&provider));

        let first = service.load_series("^gspc", Timeframe::Daily).await.unwrap();
        let second = service.load_series("^GSPC", Timeframe::Daily).await.unwrap();

        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_analyze_records_visit_and_runs_drawdown() {
        let service = service(Arc::new(StubProvider::new(rise_fall_recover())));
        let mut ctx = SessionContext::new("test");

        let report = service.analyze(&mut ctx, "^TWII", "drawdown").await.unwrap();
        match report {
            AnalysisReport::Drawdown(r) => {
                assert_eq!(r.events.len(), 1);
                assert!(!r.events[0].is_open());
                assert!(r.status.is_some());
            }
            other => panic!("unexpected report {:?}", other),
        }
        assert_eq!(ctx.visit_count("drawdown"), 1);

        let unknown = service.analyze(&mut ctx, "^TWII", "macd").await;
        assert!(matches!(unknown, Err(ServiceError::Config(_))));
    }

    #[tokio::test]
    async fn test_bias_report_needs_full_window() {
        let service = service(Arc::new(StubProvider::new(vec![100.0; 10])));
        let mut ctx = SessionContext::new("test");

        let err = service.bias_report(&mut ctx, "^TWII").await.unwrap_err();
        assert!(err.is_insufficient_history());
    }

    #[tokio::test]
    async fn test_bias_report_on_flat_series() {
        let service = service(Arc::new(StubProvider::new(vec![100.0; 60])));
        let mut ctx = SessionContext::new("test");

        let report = service.bias_report(&mut ctx, "^TWII").await.unwrap();
        assert!(report.events.is_empty());
        assert_eq!(report.moving_average, Some(100.0));
        assert_eq!(report.bias_pct, Some(0.0));
        assert_eq!(report.projection.points.len(), 18);
        assert_eq!(report.projected_gap_pct(), Some(0.0));
        let odds = report.odds.unwrap();
        assert_eq!(odds.samples, 17);
        assert_eq!(odds.decline_probability_pct, Some(0.0));
    }

    #[tokio::test]
    async fn test_provider_failure_without_repository() {
        let service = service(Arc::new(StubProvider::failing()));
        let result = service.load_series("^GSPC", Timeframe::Daily).await;
        assert!(matches!(result, Err(ServiceError::Provider(ProviderError::Network(_)))));
    }

    #[tokio::test]
    async fn test_repository_fallback_after_provider_failure() {
        let repo = BarRepository::connect("sqlite::memory:", 1, 1).await.unwrap();
        repo.ensure_tables().await.unwrap();

        let settings = Settings::defaults().unwrap();
        let start = settings.provider.start_date;
        let stored: Vec<PriceBar> = (0..3)
            .map(|i| {
                let c = 100.0 + i as f64;
                PriceBar::new(start + Duration::days(i), c, c, c, c)
            })
            .collect();
        repo.upsert_bars("^GSPC", Timeframe::Daily, &stored).await.unwrap();

        let service = service(Arc::new(StubProvider::failing())).with_repository(repo);
        let bars = service.load_series("^GSPC", Timeframe::Daily).await.unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[2].close, 102.0);
    }

    #[tokio::test]
    async fn test_broken_repository_keeps_provider_error() {
        // No tables: the fallback query fails
        let repo = BarRepository::connect("sqlite::memory:", 1, 1).await.unwrap();
        let service = service(Arc::new(StubProvider::failing())).with_repository(repo);

        let result = service.load_series("^GSPC", Timeframe::Daily).await;
        assert!(matches!(result, Err(ServiceError::Provider(ProviderError::Network(_)))));
    }

    #[tokio::test]
    async fn test_invalid_provider_bars_are_rejected() {
        let provider = Arc::new(StubProvider::new(vec![100.0, -5.0, 101.0]));
        let service = service(Arc::clone(&provider));

        let result = service.load_series("^GSPC", Timeframe::Daily).await;
        assert!(matches!(result, Err(ServiceError::Data(DataError::Validation(_)))));
        assert_eq!(service.cache().len().await, 0);
    }

    #[tokio::test]
    async fn test_portfolio_weights_are_validated() {
        let service = service(Arc::new(StubProvider::new(vec![100.0, 110.0])));
        let mut ctx = SessionContext::new("test");
        let holdings = vec![
            Holding { symbol: "SPY".into(), weight: 0.6 },
            Holding { symbol: "TLT".into(), weight: 0.3 },
        ];

        let err = service
            .portfolio_report(&mut ctx, &holdings, "^GSPC", 10_000.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[tokio::test]
    async fn test_portfolio_report_against_benchmark() {
        let service = service(Arc::new(StubProvider::new(vec![100.0, 110.0, 121.0])));
        let mut ctx = SessionContext::new("test");
        let holdings = vec![
            Holding { symbol: "SPY".into(), weight: 0.6 },
            Holding { symbol: "TLT".into(), weight: 0.4 },
        ];

        let report = service
            .portfolio_report(&mut ctx, &holdings, "^GSPC", 10_000.0)
            .await
            .unwrap();
        assert!((report.portfolio.final_balance - 12_100.0).abs() < 1e-6);
        assert_eq!(report.portfolio.max_drawdown_pct, 0.0);
        let benchmark = report.benchmark.unwrap();
        assert!((benchmark.final_balance - report.portfolio.final_balance).abs() < 1e-6);
        assert_eq!(report.first_date, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert_eq!(ctx.visit_count("portfolio"), 1);
    }
}
