use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::types::{DataError, DataResult, DbStats, PriceBar, Timeframe};

// =================================================================
// Constants and Configuration
// =================================================================

const MAX_BATCH_SIZE: usize = 500;

// =================================================================
// Repository Implementation
// =================================================================

/// SQLite store for downloaded price series
pub struct BarRepository {
    pool: SqlitePool,
}

impl BarRepository {
    pub async fn connect(url: &str, max_connections: u32, min_connections: u32) -> DataResult<Self> {
        let max_connections = max_connections.max(1);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections.min(max_connections))
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn ensure_tables(&self) -> DataResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS price_bars (
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                PRIMARY KEY (symbol, timeframe, date)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =================================================================
    // Insert Operations
    // =================================================================

    /// Insert or replace bars, chunked into transactions
    pub async fn upsert_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        bars: &[PriceBar],
    ) -> DataResult<usize> {
        if bars.is_empty() {
            return Ok(0);
        }
        if symbol.is_empty() {
            return Err(DataError::Validation("Symbol cannot be empty".into()));
        }
        for bar in bars {
            self.validate_bar(bar)?;
        }

        debug!("Upserting {} bars for {} {}", bars.len(), symbol, timeframe);

        let mut total_written = 0;
        for chunk in bars.chunks(MAX_BATCH_SIZE) {
            let mut tx = self.pool.begin().await?;
            for bar in chunk {
                sqlx::query(
                    r#"
                    INSERT INTO price_bars (symbol, timeframe, date, open, high, low, close)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(symbol, timeframe, date) DO UPDATE SET
                        open = excluded.open,
                        high = excluded.high,
                        low = excluded.low,
                        close = excluded.close
                    "#,
                )
                .bind(symbol)
                .bind(timeframe.as_str())
                .bind(bar.date)
                .bind(bar.open)
                .bind(bar.high)
                .bind(bar.low)
                .bind(bar.close)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            total_written += chunk.len();
        }

        info!(
            "Stored {} bars for {} {}",
            total_written, symbol, timeframe
        );
        Ok(total_written)
    }

    // =================================================================
    // Query Operations
    // =================================================================

    /// Bars ascending by date, optionally from `since` onwards
    pub async fn load_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<NaiveDate>,
    ) -> DataResult<Vec<PriceBar>> {
        let rows: Vec<(NaiveDate, f64, f64, f64, f64)> = match since {
            Some(since) => {
                sqlx::query_as(
                    r#"
                    SELECT date, open, high, low, close FROM price_bars
                    WHERE symbol = ?1 AND timeframe = ?2 AND date >= ?3
                    ORDER BY date ASC
                    "#,
                )
                .bind(symbol)
                .bind(timeframe.as_str())
                .bind(since)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT date, open, high, low, close FROM price_bars
                    WHERE symbol = ?1 AND timeframe = ?2
                    ORDER BY date ASC
                    "#,
                )
                .bind(symbol)
                .bind(timeframe.as_str())
                .fetch_all(&self.pool)
                .await?
            }
        };

        debug!("Loaded {} stored bars for {} {}", rows.len(), symbol, timeframe);

        Ok(rows
            .into_iter()
            .map(|(date, open, high, low, close)| PriceBar::new(date, open, high, low, close))
            .collect())
    }

    /// Get database statistics
    pub async fn get_db_stats(&self, symbol: Option<&str>) -> DataResult<DbStats> {
        let (total, earliest, latest): (i64, Option<NaiveDate>, Option<NaiveDate>) = match symbol {
            Some(symbol) => {
                sqlx::query_as(
                    "SELECT COUNT(*), MIN(date), MAX(date) FROM price_bars WHERE symbol = ?1",
                )
                .bind(symbol)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*), MIN(date), MAX(date) FROM price_bars")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(DbStats {
            symbol: symbol.map(|s| s.to_string()),
            total_records: total.max(0) as u64,
            earliest_date: earliest,
            latest_date: latest,
        })
    }

    // =================================================================
    // Helper Methods
    // =================================================================

    fn validate_bar(&self, bar: &PriceBar) -> DataResult<()> {
        if !bar.is_valid() {
            return Err(DataError::Validation(format!(
                "Bar {} must have positive prices and high >= low",
                bar.date
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> PriceBar {
        let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        PriceBar::new(date, close, close + 1.0, close - 1.0, close)
    }

    async fn memory_repo() -> BarRepository {
        let repo = BarRepository::connect("sqlite::memory:", 1, 1).await.unwrap();
        repo.ensure_tables().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_upsert_and_load_roundtrip_order() {
        let repo = memory_repo().await;
        let bars = vec![bar(4, 102.0), bar(1, 100.0), bar(2, 101.0)];

        let written = repo.upsert_bars("^GSPC", Timeframe::Daily, &bars).await.unwrap();
        assert_eq!(written, 3);

        let loaded = repo.load_bars("^GSPC", Timeframe::Daily, None).await.unwrap();
        let closes: Vec<f64> = loaded.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![100.0, 101.0, 102.0]);

        let weekly = repo.load_bars("^GSPC", Timeframe::Weekly, None).await.unwrap();
        assert!(weekly.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_date() {
        let repo = memory_repo().await;
        repo.upsert_bars("^TWII", Timeframe::Daily, &[bar(1, 100.0)]).await.unwrap();
        repo.upsert_bars("^TWII", Timeframe::Daily, &[bar(1, 105.0)]).await.unwrap();

        let loaded = repo.load_bars("^TWII", Timeframe::Daily, None).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].close, 105.0);
    }

    #[tokio::test]
    async fn test_load_since_and_stats() {
        let repo = memory_repo().await;
        let bars: Vec<PriceBar> = (1..=5).map(|d| bar(d, 100.0 + d as f64)).collect();
        repo.upsert_bars("^IXIC", Timeframe::Daily, &bars).await.unwrap();

        let since = NaiveDate::from_ymd_opt(2024, 3, 3);
        let loaded = repo.load_bars("^IXIC", Timeframe::Daily, since).await.unwrap();
        assert_eq!(loaded.len(), 3);

        let stats = repo.get_db_stats(Some("^IXIC")).await.unwrap();
        assert_eq!(stats.total_records, 5);
        assert_eq!(stats.earliest_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(stats.latest_date, NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[tokio::test]
    async fn test_rejects_invalid_bar() {
        let repo = memory_repo().await;
        let mut broken = bar(1, 100.0);
        broken.low = 200.0;

        let result = repo.upsert_bars("^GSPC", Timeframe::Daily, &[broken]).await;
        assert!(matches!(result, Err(DataError::Validation(_))));
        assert_eq!(repo.get_db_stats(None).await.unwrap().total_records, 0);
    }
}
