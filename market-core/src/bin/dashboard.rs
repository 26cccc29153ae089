// market-core/src/bin/dashboard.rs
// Index dashboard: waves, drawdown events, rebound legs and the 40-period bias panel

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use market_core::analysis::{
    get_analyzer_info, list_analyzers, AnalysisReport, DrawdownReport, PerformanceMetrics,
    ReboundReport, WaveReport,
};
use market_core::config::Settings;
use market_core::data::types::round2;
use market_core::data::{BarRepository, SeriesCache};
use market_core::provider::{validate_symbol, YahooChartProvider};
use market_core::service::{
    BiasReport, DashboardService, Holding, PortfolioReport, ServiceError, SessionContext,
};
use market_core::universe::IndexUniverse;

const PORTFOLIO_START_BALANCE: f64 = 10_000.0;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::new().context("Konfiguration konnte nicht geladen werden")?;
    let universe = IndexUniverse::from_symbols(&settings.symbols);

    // Usage: dashboard [SYMBOL] [ANALYZER] [--json]
    let (flags, args): (Vec<String>, Vec<String>) =
        env::args().skip(1).partition(|a| a.starts_with("--"));
    let as_json = flags.iter().any(|f| f == "--json");
    let symbol = args
        .first()
        .cloned()
        .or_else(|| settings.symbols.first().cloned())
        .context("Kein Symbol angegeben und keine Symbole konfiguriert")?;

    println!("🚀 MARKET DASHBOARD STARTING...");
    println!("📈 {} ({})", universe.display_name(&symbol), symbol);

    let provider = YahooChartProvider::new(
        &settings.provider.base_url,
        Duration::from_secs(settings.provider.timeout_seconds),
    )?;
    let cache = SeriesCache::new(settings.cache_ttl(), settings.cache.max_series);
    let mut service = DashboardService::new(Arc::new(provider), cache, settings.clone())?;

    if settings.database.enabled {
        let repo = BarRepository::connect(
            &settings.get_db_url(),
            settings.database.max_connections,
            settings.database.min_connections,
        )
        .await?;
        repo.ensure_tables().await?;
        let stats = repo.get_db_stats(Some(&validate_symbol(&symbol)?)).await?;
        println!(
            "💾 Persistence: {} ({} stored bars, {} .. {})",
            settings.get_db_url(),
            stats.total_records,
            stats.earliest_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            stats.latest_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
        );
        service = service.with_repository(repo);
    }

    // Optional second argument restricts the run to one analyzer
    let analyzers = match args.get(1) {
        Some(id) => vec![get_analyzer_info(id)
            .with_context(|| format!("Unbekannter Analyzer: {}", id))?],
        None => list_analyzers(),
    };

    let mut ctx = SessionContext::new(format!("cli-{}", std::process::id()));
    if let Ok(user) = env::var("USER") {
        ctx = ctx.with_user(user);
    }

    for info in &analyzers {
        match service.analyze(&mut ctx, &symbol, &info.id).await {
            Ok(report) if as_json => println!("{}", report.to_json()?),
            Ok(report) => print_report(&info.name, &report),
            Err(e) => print_failure(&info.name, &e),
        }
    }

    match service.bias_report(&mut ctx, &symbol).await {
        Ok(report) => print_bias(&report, &settings),
        Err(e) => print_failure("Moving-Average Bias", &e),
    }

    // Gleichgewichteter Korb aller konfigurierten Indizes gegen das Symbol
    if settings.symbols.len() > 1 {
        let weight = 1.0 / settings.symbols.len() as f64;
        let holdings: Vec<Holding> = settings
            .symbols
            .iter()
            .map(|s| Holding {
                symbol: s.clone(),
                weight,
            })
            .collect();
        match service
            .portfolio_report(&mut ctx, &holdings, &symbol, PORTFOLIO_START_BALANCE)
            .await
        {
            Ok(report) => print_portfolio(&report),
            Err(e) => print_failure("Portfolio", &e),
        }
    }

    println!(
        "\n🧾 Session {} ({}): {} pages, bias viewed {}x",
        ctx.session_id,
        ctx.user.as_deref().unwrap_or("anonymous"),
        ctx.visits.len(),
        ctx.visit_count("bias")
    );
    Ok(())
}

fn print_portfolio(r: &PortfolioReport) {
    let separator = "=".repeat(100);
    println!("\n{}", separator);
    println!(
        "💼 PORTFOLIO {} .. {} (start {:.0})",
        r.first_date, r.last_date, r.start_balance
    );
    println!("{}", separator);
    for h in &r.holdings {
        println!("{:<10} | {:>6.1}%", h.symbol, h.weight * 100.0);
    }

    println!(
        "\n{:<12} | {:>12} | {:>8} | {:>8} | {:>10} | {:>10}",
        "", "FINAL", "CAGR", "MAX DD", "BEST YEAR", "WORST YEAR"
    );
    println!("{:-<75}", "");
    let row = |label: &str, m: &PerformanceMetrics| {
        println!(
            "{:<12} | {:>12.2} | {:>7.2}% | {:>7.2}% | {:>9.2}% | {:>9.2}%",
            label, m.final_balance, m.cagr_pct, m.max_drawdown_pct, m.best_year_pct, m.worst_year_pct
        );
    };
    row("Portfolio", &r.portfolio);
    match &r.benchmark {
        Some(m) => row(&r.benchmark_symbol, m),
        None => println!("{:<12} | no overlapping history", r.benchmark_symbol),
    }
}

fn print_failure(section: &str, err: &ServiceError) {
    if err.is_insufficient_history() {
        println!("\n[{}] not enough history: {}", section, err);
    } else {
        println!("\n[{}] ⚠️ {}", section, err);
    }
}

fn print_report(title: &str, report: &AnalysisReport) {
    let separator = "=".repeat(100);
    println!("\n{}", separator);
    println!("📊 {}", title.to_uppercase());
    println!("{}", separator);

    match report {
        AnalysisReport::Waves(r) => print_waves(r),
        AnalysisReport::Drawdown(r) => print_drawdown(r),
        AnalysisReport::Rebound(r) => print_rebound(r),
    }
}

fn print_waves(r: &WaveReport) {
    println!(
        "Reversal: {}% | Waves: {} ({} sealed)",
        r.reversal_pct,
        r.waves.len(),
        r.sealed_waves
    );
    println!(
        "{:<6} | {:<10} | {:<10} | {:>10} | {:>10} | {:>8} | {:>6} | {}",
        "TYPE", "START", "END", "FROM", "TO", "CHANGE", "DAYS", "STATUS"
    );
    println!("{:-<90}", "");
    for w in r.waves.iter().rev().take(20).rev() {
        println!(
            "{:<6} | {:<10} | {:<10} | {:>10.2} | {:>10.2} | {:>7.2}% | {:>6} | {}",
            format!("{:?}", w.wave_type).to_uppercase(),
            w.start_date,
            w.end_date,
            w.start_price,
            w.end_price,
            w.change_pct(),
            w.days(),
            if w.ongoing {
                "ongoing"
            } else if w.leading {
                "leading"
            } else {
                "sealed"
            }
        );
    }
    println!(
        "\nUp legs: {} | Avg gain: {:.2}% | Avg days: {:.1} | P(gain >= 20%): {:.1}%",
        r.leg_summary.total_legs,
        r.leg_summary.avg_gain_pct,
        r.leg_summary.avg_days,
        r.leg_summary.prob_gain_ge_20_pct
    );
}

fn print_drawdown(r: &DrawdownReport) {
    println!(
        "Trigger: {}% | Recovery target: {} | Events: {} ({} open)",
        r.trigger_pct,
        r.recovery_target.as_str(),
        r.summary.total_events,
        r.summary.open_events
    );
    println!(
        "{:<10} | {:>10} | {:>10} | {:<10} | {:>10} | {:>8} | {:>8} | {:<10}",
        "TRIGGER", "PRICE", "PRIOR HIGH", "BOTTOM", "LOW", "MAX DD", "RESID", "RECOVERY"
    );
    println!("{:-<100}", "");
    for e in &r.events {
        println!(
            "{:<10} | {:>10.2} | {:>10.2} | {:<10} | {:>10.2} | {:>7.2}% | {:>7.2}% | {}",
            e.trigger_date,
            e.trigger_price,
            e.prior_high,
            e.bottom_date,
            e.bottom_price,
            e.max_drawdown_pct,
            e.residual_drawdown_pct,
            e.recovery_date
                .map(|d| format!("{} ({}d)", d, e.days_to_recovery_or_elapsed))
                .unwrap_or_else(|| format!("open ({}d)", e.days_to_recovery_or_elapsed))
        );
    }

    let s = &r.summary;
    println!("\n[SUMMARY over {} recovered events]", s.recovered_events);
    println!("Avg residual drawdown: {:.2}%", s.avg_residual_drawdown_pct);
    println!("Avg days to bottom:    {:.1}", s.avg_days_to_bottom);
    println!("Avg days to recovery:  {:.1}", s.avg_days_to_recovery);
    println!("P(residual > 10%):     {:.1}%", s.prob_residual_gt_10_pct);
    println!("P(residual > 20%):     {:.1}%", s.prob_residual_gt_20_pct);

    println!("\n{:<12} | {:>6} | {:>8}", "RANGE", "COUNT", "PROB");
    for b in &s.distribution {
        println!("{:<12} | {:>6} | {:>7.2}%", b.range_label, b.count, b.probability_pct);
    }

    if let Some(status) = &r.status {
        println!(
            "\n[MONITOR {}] close {:.2} is {:.2}% below {:.2}",
            status.as_of, status.last_close, status.current_drawdown_pct, status.reference_high
        );
        if status.triggered {
            println!(
                "🚨 Inside the {}% zone. Historically {:.1}% of events fell another 10%+.",
                r.trigger_pct, status.prob_residual_gt_10_pct
            );
        } else {
            println!("{:.2}% more to the trigger.", status.distance_to_trigger_pct);
        }
    }
}

fn print_rebound(r: &ReboundReport) {
    println!("Legs after {}% drawdowns: {}", r.trigger_pct, r.legs.len());
    println!(
        "{:<10} | {:>10} | {:<10} | {:>10} | {:>8} | {:>6} | {}",
        "FROM", "PRICE", "TO", "PRICE", "GAIN", "DAYS", "STATUS"
    );
    println!("{:-<80}", "");
    for leg in &r.legs {
        println!(
            "{:<10} | {:>10.2} | {:<10} | {:>10.2} | {:>7.2}% | {:>6} | {:?}",
            leg.start_date,
            leg.start_price,
            leg.end_date,
            leg.end_price,
            leg.gain_pct,
            leg.days,
            leg.status
        );
    }

    let s = &r.summary;
    println!(
        "\nLegs: {} | Avg gain: {:.2}% | Avg days: {:.1} | P(gain >= 20%): {:.1}%",
        s.total_legs, s.avg_gain_pct, s.avg_days, s.prob_gain_ge_20_pct
    );
    for b in &s.distribution {
        println!("{:<12} | {:>6} | {:>7.2}%", b.range_label, b.count, b.probability_pct);
    }
}

fn print_bias(r: &BiasReport, settings: &Settings) {
    let separator = "=".repeat(100);
    println!("\n{}", separator);
    println!(
        "📈 {}-PERIOD BIAS ({}) as of {}",
        settings.bias.ma_window, settings.bias.timeframe, r.as_of
    );
    println!("{}", separator);

    match (r.moving_average, r.bias_pct) {
        (Some(ma), Some(bias)) => {
            let flag = if bias > settings.bias.entry_threshold { "🔥" } else { "  " };
            println!("{} Close {:.2} | MA {:.2} | Bias {:.2}%", flag, r.last_close, ma, bias);
        }
        _ => println!("Bias not available yet"),
    }
    if let Some(regime) = r.current_regime {
        println!("Open excursion, regime: {}", regime.label());
    }

    if let Some(odds) = &r.odds {
        match odds.decline_probability_pct {
            Some(p) => println!(
                "Bias {:.2}% ~ {:.2}%: {} cases, lower after {} periods in {}%",
                odds.current_bias_pct - odds.margin,
                odds.current_bias_pct + odds.margin,
                odds.samples,
                odds.horizon,
                round2(p)
            ),
            None => println!("Not enough similar-bias history"),
        }
    }

    if let (Some((date, target)), Some(gap)) = (r.projection.target(), r.projected_gap_pct()) {
        println!(
            "Flat at {:.2}, the MA reaches {:.2} by {} ({:+.2}% from here)",
            r.projection.assumed_close, target, date, gap
        );
    }

    println!(
        "\n{:<10} | {:<16} | {:>8} | {:>10} | {:>10} | {:>8} | {:<10} | {:>8} | {:>5}",
        "TRIGGER", "REGIME", "PRIOR DD", "PRICE", "PEAK", "SURGE", "RETURN", "FROM PK", "WEEKS"
    );
    println!("{:-<110}", "");
    for e in &r.events {
        println!(
            "{:<10} | {:<16} | {:>7.2}% | {:>10.2} | {:>10.2} | {:>7.2}% | {:<10} | {:>8} | {:>5}",
            e.trigger_date,
            e.regime.label(),
            e.trailing_max_drawdown_pct,
            e.trigger_price,
            e.peak_price,
            e.peak_surge_pct,
            e.return_date.map(|d| d.to_string()).unwrap_or_else(|| "open".to_string()),
            e.total_drawdown_from_peak_pct
                .map(|p| format!("{:.2}%", p))
                .unwrap_or_else(|| "-".to_string()),
            e.duration_weeks()
        );
    }
}
