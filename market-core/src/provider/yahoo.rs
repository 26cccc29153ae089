// ====
// Yahoo Finance chart endpoint
// ====
// GET {base}/v8/finance/chart/{symbol}?period1&period2&interval
// Rows with a missing OHLC value are dropped
// ====

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::errors::ProviderError;
use super::traits::PriceProvider;
use super::utils::validate_symbol;
use market_common::data::{PriceBar, Timeframe};

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; market-core/0.1)";

// ====================================================================
// RESPONSE TYPES
// ====================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartData>>,
    error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

// ====================================================================
// PROVIDER
// ====================================================================

pub struct YahooChartProvider {
    client: Client,
    base_url: String,
}

impl YahooChartProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(
        &self,
        symbol: &str,
        start: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::ParseError(format!("Base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);

        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = Utc::now().timestamp();
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &period2.to_string())
            .append_pair("interval", timeframe.as_str());
        Ok(url)
    }
}

#[async_trait]
impl PriceProvider for YahooChartProvider {
    async fn fetch_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let symbol = validate_symbol(symbol)?;
        let url = self.chart_url(&symbol, start, timeframe)?;
        debug!("GET {}", url);

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let bars = parse_chart(&symbol, &body)?;
        info!(
            "Fetched {} {} bars for {} since {}",
            bars.len(),
            timeframe,
            symbol,
            start
        );
        Ok(bars)
    }
}

// ====================================================================
// PARSING
// ====================================================================

/// Decode a chart response body into a clean series.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<PriceBar>, ProviderError> {
    let response: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = response.chart.error {
        return Err(if err.code.eq_ignore_ascii_case("Not Found") {
            ProviderError::InvalidSymbol(format!("{}: {}", symbol, err.description))
        } else {
            ProviderError::ParseError(format!("[{}] {}", err.code, err.description))
        });
    }

    let data = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ProviderError::EmptySeries(symbol.to_string()))?;

    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();

    let mut rows = Vec::with_capacity(data.timestamp.len());
    let mut missing = 0usize;
    for (i, ts) in data.timestamp.iter().enumerate() {
        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close), Some(date)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
            DateTime::from_timestamp(ts + offset, 0).map(|dt| dt.date_naive()),
        ) else {
            missing += 1;
            continue;
        };
        rows.push(PriceBar::new(date, open, high, low, close));
    }
    if missing > 0 {
        debug!("{}: dropped {} rows with missing values", symbol, missing);
    }

    let bars = normalize_rows(rows);
    if bars.is_empty() {
        return Err(ProviderError::EmptySeries(symbol.to_string()));
    }
    Ok(bars)
}

/// Drop invalid bars, sort ascending and keep the last row per date.
pub fn normalize_rows(mut rows: Vec<PriceBar>) -> Vec<PriceBar> {
    let before = rows.len();
    rows.retain(PriceBar::is_valid);
    if rows.len() < before {
        warn!("Dropped {} invalid bars", before - rows.len());
    }

    rows.sort_by_key(|b| b.date);
    let mut out: Vec<PriceBar> = Vec::with_capacity(rows.len());
    for bar in rows {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}
