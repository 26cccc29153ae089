// market-core/src/bin/universe_scan.rs
// Universe scan: where does each configured index stand against its drawdown history?

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use market_core::analysis::{
    current_drawdown, summarize, BucketEdges, DrawdownTracker, WaveSegmenter,
};
use market_core::config::Settings;
use market_core::data::{PriceBar, SeriesCache};
use market_core::provider::YahooChartProvider;
use market_core::service::DashboardService;
use market_core::universe::IndexUniverse;

struct ScanRow {
    symbol: String,
    name: String,
    last_close: f64,
    current_drawdown_pct: f64,
    triggered: bool,
    events: usize,
    avg_residual_pct: f64,
    prob_residual_gt_10_pct: f64,
    waves: usize,
}

fn scan(
    symbol: &str,
    name: &str,
    bars: &[PriceBar],
    settings: &Settings,
    edges: &BucketEdges,
) -> Option<ScanRow> {
    let tracker = DrawdownTracker::new(settings.drawdown_config());
    let events = tracker.track(bars);
    let summary = summarize(&events, edges);
    let status = current_drawdown(bars, &events, &summary, settings.analysis.trigger_pct)?;
    let waves = WaveSegmenter::new(settings.wave_config()).segment(bars);

    Some(ScanRow {
        symbol: symbol.to_string(),
        name: name.to_string(),
        last_close: status.last_close,
        current_drawdown_pct: status.current_drawdown_pct,
        triggered: status.triggered,
        events: summary.total_events,
        avg_residual_pct: summary.avg_residual_drawdown_pct,
        prob_residual_gt_10_pct: summary.prob_residual_gt_10_pct,
        waves: waves.len(),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new().context("Konfiguration konnte nicht geladen werden")?;
    let universe = IndexUniverse::from_symbols(&settings.symbols);
    let edges = BucketEdges::new(settings.analysis.drawdown_bucket_edges.clone())?;

    let provider = YahooChartProvider::new(
        &settings.provider.base_url,
        Duration::from_secs(settings.provider.timeout_seconds),
    )?;
    let cache = SeriesCache::new(settings.cache_ttl(), settings.cache.max_series);
    let service = DashboardService::new(Arc::new(provider), cache, settings.clone())?;

    let mut loaded: Vec<(String, String, Arc<Vec<PriceBar>>)> = Vec::new();
    for info in universe.indices() {
        match service.load_series(&info.symbol, settings.provider.interval).await {
            Ok(bars) => loaded.push((info.symbol.clone(), info.name.clone(), bars)),
            Err(e) => warn!("Skipping {}: {}", info.symbol, e),
        }
    }

    let mut rows: Vec<ScanRow> = loaded
        .par_iter()
        .filter_map(|(symbol, name, bars)| scan(symbol, name, bars, &settings, &edges))
        .collect();

    // Tiefster aktueller Drawdown zuerst
    rows.sort_by(|a, b| b.current_drawdown_pct.total_cmp(&a.current_drawdown_pct));

    println!(
        "\n🛡️ --- UNIVERSE SCAN ({}% trigger, {} bars) ---",
        settings.analysis.trigger_pct, settings.provider.interval
    );
    println!(
        "{:<8} | {:<22} | {:>10} | {:>8} | {:>6} | {:>9} | {:>9} | {:>5} | {}",
        "SYMBOL", "NAME", "CLOSE", "DD", "EVENTS", "AVG RESID", "P(>10%)", "WAVES", "STATUS"
    );
    println!("{:-<110}", "");

    for row in &rows {
        let status = if row.triggered {
            "🚨 IN ZONE"
        } else if row.current_drawdown_pct >= settings.analysis.trigger_pct / 2.0 {
            "⚠️ WATCH"
        } else {
            "💤 CALM"
        };
        println!(
            "{:<8} | {:<22} | {:>10.2} | {:>7.2}% | {:>6} | {:>8.2}% | {:>8.1}% | {:>5} | {}",
            row.symbol,
            row.name,
            row.last_close,
            row.current_drawdown_pct,
            row.events,
            row.avg_residual_pct,
            row.prob_residual_gt_10_pct,
            row.waves,
            status
        );
    }

    println!("{:-<110}", "");
    println!("INFO: IN ZONE = Trigger erreicht | WATCH = halber Weg | CALM = nahe am Hoch");
    Ok(())
}
