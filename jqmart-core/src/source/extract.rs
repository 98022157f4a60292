//! Extraction orchestration — fetch raw snapshots from the provider.
//!
//! The listed-company master comes down in one paginated sweep. Prices come
//! down one trading day at a time (that is how the provider shards the
//! endpoint), with a consecutive-empty-day cutoff so a window that falls
//! outside the plan's range stops early instead of hammering the API.

use chrono::{Duration, NaiveDate};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use super::client::{JQuantsClient, SourceError};
use super::records::{
    daily_bars_to_dataframe, listed_info_to_dataframe, DailyBarRecord, ListedInfoRecord,
};

/// Stop the day-by-day price loop after this many empty days in a row.
pub const MAX_CONSECUTIVE_EMPTY_DAYS: usize = 10;

/// Extraction window, expressed the way the provider's free plan forces it:
/// the window ends `weeks_ago` weeks before today and spans `days` days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub days: i64,
    /// The free plan refuses anything younger than 12 weeks.
    pub weeks_ago: i64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            days: 7,
            weeks_ago: 12,
        }
    }
}

impl ExtractionConfig {
    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ExtractError> {
        toml::from_str(content).map_err(|e| ExtractError::Config(e.to_string()))
    }

    pub fn end_date(&self, today: NaiveDate) -> NaiveDate {
        today - Duration::weeks(self.weeks_ago)
    }

    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        self.end_date(today) - Duration::days(self.days)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("raw frame build failed: {0}")]
    Frame(String),

    #[error("invalid extraction config: {0}")]
    Config(String),
}

/// Progress callback for the extraction loops.
pub trait ExtractProgress {
    /// A price day finished; `rows` may be zero on holidays.
    fn on_day(&self, date: NaiveDate, rows: usize);

    /// A price day was skipped because of a non-fatal fetch error.
    fn on_day_skipped(&self, date: NaiveDate, reason: &str);

    /// A whole source finished.
    fn on_source_complete(&self, table: &str, rows: usize);
}

/// Progress reporter that prints one line per day to stdout.
pub struct StdoutProgress;

impl ExtractProgress for StdoutProgress {
    fn on_day(&self, date: NaiveDate, rows: usize) {
        if rows > 0 {
            println!("  {date}: {rows} records");
        } else {
            println!("  {date}: no data");
        }
    }

    fn on_day_skipped(&self, date: NaiveDate, reason: &str) {
        println!("  {date}: skipped ({reason})");
    }

    fn on_source_complete(&self, table: &str, rows: usize) {
        println!("raw.{table}: {rows} rows fetched");
    }
}

/// Fetch the listed-company master and return the raw frame.
pub fn extract_listed_info(
    client: &JQuantsClient,
    progress: &dyn ExtractProgress,
) -> Result<DataFrame, ExtractError> {
    let records: Vec<ListedInfoRecord> = client.get_all_pages("/equities/master", &[])?;
    let df = listed_info_to_dataframe(&records).map_err(|e| ExtractError::Frame(e.to_string()))?;
    progress.on_source_complete("listed_info", df.height());
    Ok(df)
}

/// Fetch daily bars for every date in `[start, end]`.
///
/// Per-day fetch failures are skipped and count as empty days; only an
/// authentication failure aborts the loop, since it cannot heal on its own.
/// The returned frame may be empty — the caller decides whether an empty
/// window is worth landing.
pub fn extract_stock_prices(
    client: &JQuantsClient,
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn ExtractProgress,
) -> Result<DataFrame, ExtractError> {
    let mut all: Vec<DailyBarRecord> = Vec::new();
    let mut consecutive_empty = 0;
    let mut current = start;

    while current <= end {
        let params = [("date".to_string(), current.to_string())];
        match client.get_all_pages::<DailyBarRecord>("/equities/bars/daily", &params) {
            Ok(rows) if !rows.is_empty() => {
                progress.on_day(current, rows.len());
                consecutive_empty = 0;
                all.extend(rows);
            }
            Ok(_) => {
                progress.on_day(current, 0);
                consecutive_empty += 1;
            }
            Err(e @ SourceError::Authentication { .. }) => return Err(e.into()),
            Err(e) => {
                progress.on_day_skipped(current, &e.to_string());
                consecutive_empty += 1;
            }
        }

        if consecutive_empty >= MAX_CONSECUTIVE_EMPTY_DAYS {
            log::warn!(
                "stopping price extraction: {MAX_CONSECUTIVE_EMPTY_DAYS} consecutive days with no data"
            );
            break;
        }

        current += Duration::days(1);
        if current <= end {
            std::thread::sleep(client.request_interval());
        }
    }

    let df = daily_bars_to_dataframe(&all).map_err(|e| ExtractError::Frame(e.to_string()))?;
    progress.on_source_complete("stock_prices", df.height());
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_ends_weeks_ago_and_spans_days() {
        let config = ExtractionConfig::default();
        let today = ymd(2026, 8, 7);

        let end = config.end_date(today);
        let start = config.start_date(today);

        assert_eq!(end, ymd(2026, 5, 15)); // 12 weeks back
        assert_eq!(start, ymd(2026, 5, 8)); // 7 days before that
        assert_eq!((end - start).num_days(), 7);
    }

    #[test]
    fn config_parses_from_toml() {
        let config = ExtractionConfig::from_toml("days = 14\nweeks_ago = 13\n").unwrap();
        assert_eq!(
            config,
            ExtractionConfig {
                days: 14,
                weeks_ago: 13
            }
        );
    }

    #[test]
    fn bad_config_is_a_typed_error() {
        let err = ExtractionConfig::from_toml("days = \"a week\"").unwrap_err();
        assert!(matches!(err, ExtractError::Config(_)));
    }
}
