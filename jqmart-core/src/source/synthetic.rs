//! Deterministic synthetic raw snapshot for offline development.
//!
//! `extract --synthetic` lands these frames in the warehouse instead of
//! calling the provider. Each company's prices are a random walk seeded from
//! its code, so repeated runs produce identical raw tables and everything
//! downstream (fingerprints included) stays reproducible.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use polars::prelude::{DataFrame, PolarsResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::records::{
    daily_bars_to_dataframe, listed_info_to_dataframe, DailyBarRecord, ListedInfoRecord,
};

/// Small fixed roster of sector/market combinations to cycle through.
const SECTORS: &[(&str, &str, &str, &str)] = &[
    ("1", "食品", "50", "食料品"),
    ("6", "自動車・輸送機", "3700", "輸送用機器"),
    ("10", "情報通信・サービスその他", "5250", "情報・通信業"),
    ("13", "銀行", "7050", "銀行業"),
    ("16", "小売", "6100", "小売業"),
];

const SCALE_CATEGORIES: &[&str] = &["TOPIX Core30", "TOPIX Large70", "TOPIX Mid400", "-"];

/// Generate a raw-shaped `(listed_info, stock_prices)` snapshot for
/// `companies` fake names over `[start, end]`, weekdays only.
pub fn synthetic_snapshot(
    companies: usize,
    start: NaiveDate,
    end: NaiveDate,
) -> PolarsResult<(DataFrame, DataFrame)> {
    let codes: Vec<String> = (0..companies)
        .map(|i| format!("{:04}0", 1301 + i * 7))
        .collect();

    let listed: Vec<ListedInfoRecord> = codes
        .iter()
        .enumerate()
        .map(|(i, code)| {
            let (s17, s17_nm, s33, s33_nm) = SECTORS[i % SECTORS.len()];
            ListedInfoRecord {
                date: end.to_string(),
                code: code.clone(),
                co_name: format!("テスト株式会社{}", i + 1),
                co_name_en: format!("Test Corp {}", i + 1),
                s17: s17.to_string(),
                s17_nm: s17_nm.to_string(),
                s33: s33.to_string(),
                s33_nm: s33_nm.to_string(),
                scale_cat: SCALE_CATEGORIES[i % SCALE_CATEGORIES.len()].to_string(),
                mkt: "0111".to_string(),
                mkt_nm: "プライム".to_string(),
            }
        })
        .collect();

    let mut bars: Vec<DailyBarRecord> = Vec::new();
    for code in &codes {
        bars.extend(synthetic_bars(code, start, end));
    }

    Ok((
        listed_info_to_dataframe(&listed)?,
        daily_bars_to_dataframe(&bars)?,
    ))
}

/// Random-walk daily bars for one company, deterministic in the code.
fn synthetic_bars(code: &str, start: NaiveDate, end: NaiveDate) -> Vec<DailyBarRecord> {
    let seed: [u8; 32] = *blake3::hash(code.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = rng.gen_range(500.0..5000.0_f64);
    let mut current = start;

    while current <= end {
        // The real endpoint only serves trading days; skip weekends.
        let weekday = current.weekday();
        if weekday == Weekday::Sat || weekday == Weekday::Sun {
            current += Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(50_000.0..5_000_000.0_f64).round();

        bars.push(DailyBarRecord {
            code: code.to_string(),
            date: current.to_string(),
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
            turnover_value: Some((close * volume).round()),
            adj_factor: Some(1.0),
            adj_open: Some(open),
            adj_high: Some(high),
            adj_low: Some(low),
            adj_close: Some(close),
        });

        price = close;
        current += Duration::days(1);
    }

    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn snapshot_is_deterministic() {
        let (listed_a, prices_a) = synthetic_snapshot(5, ymd(2025, 1, 6), ymd(2025, 1, 17)).unwrap();
        let (listed_b, prices_b) = synthetic_snapshot(5, ymd(2025, 1, 6), ymd(2025, 1, 17)).unwrap();

        assert!(listed_a.equals(&listed_b));
        assert!(prices_a.equals(&prices_b));
    }

    #[test]
    fn different_codes_walk_differently() {
        let a = synthetic_bars("13010", ymd(2025, 1, 6), ymd(2025, 1, 10));
        let b = synthetic_bars("13080", ymd(2025, 1, 6), ymd(2025, 1, 10));

        assert_eq!(a.len(), b.len());
        assert_ne!(a[0].close, b[0].close);
    }

    #[test]
    fn bars_skip_weekends() {
        // 2025-01-04 is a Saturday, 2025-01-05 a Sunday.
        let bars = synthetic_bars("13010", ymd(2025, 1, 3), ymd(2025, 1, 6));
        let dates: Vec<&str> = bars.iter().map(|b| b.date.as_str()).collect();
        assert_eq!(dates, ["2025-01-03", "2025-01-06"]);
    }

    #[test]
    fn roster_has_one_listed_row_per_company() {
        let (listed, _) = synthetic_snapshot(8, ymd(2025, 1, 6), ymd(2025, 1, 7)).unwrap();
        assert_eq!(listed.height(), 8);
    }
}
