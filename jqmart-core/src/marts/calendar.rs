//! Calendar dimension builder.
//!
//! Derives one row per calendar day spanning the observed date bounds of the
//! staged price relation — weekends and holidays included, no gaps. The range
//! is derived from the data, never hardcoded. Fiscal attributes follow the
//! April-start Japanese fiscal year.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use polars::prelude::*;

#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("staged price relation is empty — cannot derive a calendar range")]
    EmptyPriceRelation,

    #[error("calendar build failed: {0}")]
    Frame(String),
}

/// One row of `dim_date`. Every attribute is a pure function of the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub year: i32,
    /// Calendar quarter, 1-4.
    pub quarter: u32,
    pub month: u32,
    pub day: u32,
    /// 0=Sunday .. 6=Saturday.
    pub day_of_week: u32,
    pub day_name: &'static str,
    pub is_weekend: bool,
    pub fiscal_year: i32,
    /// April-start quarter: Apr-Jun=1, Jul-Sep=2, Oct-Dec=3, Jan-Mar=4.
    pub fiscal_quarter: u32,
}

impl CalendarDay {
    pub fn from_date(date: NaiveDate) -> Self {
        let month = date.month();
        let day_of_week = date.weekday().num_days_from_sunday();

        Self {
            date,
            year: date.year(),
            quarter: (month - 1) / 3 + 1,
            month,
            day: date.day(),
            day_of_week,
            day_name: day_name(date.weekday()),
            is_weekend: day_of_week == 0 || day_of_week == 6,
            fiscal_year: fiscal_year(date),
            fiscal_quarter: fiscal_quarter(month),
        }
    }
}

/// April-start fiscal year: April..December belong to the current calendar
/// year, January..March to the previous one.
pub fn fiscal_year(date: NaiveDate) -> i32 {
    if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Fiscal quarter bands. Q4 is months 1-3 — non-contiguous with Q1 (4-6)
/// on the calendar axis.
pub fn fiscal_quarter(month: u32) -> u32 {
    match month {
        4..=6 => 1,
        7..=9 => 2,
        10..=12 => 3,
        _ => 4,
    }
}

fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

/// Closed day spine: every date in `[min_date, max_date]`, both ends
/// included, not filtered by any business calendar.
pub fn date_spine(min_date: NaiveDate, max_date: NaiveDate) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = min_date;
    while current <= max_date {
        dates.push(current);
        current += Duration::days(1);
    }
    dates
}

/// Build `dim_date` from the staged price relation.
pub fn build_dim_date(stg_prices: &DataFrame) -> Result<DataFrame, CalendarError> {
    let (min_date, max_date) = observed_date_bounds(stg_prices)?;

    let days: Vec<CalendarDay> = date_spine(min_date, max_date)
        .into_iter()
        .map(CalendarDay::from_date)
        .collect();

    calendar_to_dataframe(&days)
}

/// Global min/max of the `date` column across all staged price rows.
fn observed_date_bounds(stg_prices: &DataFrame) -> Result<(NaiveDate, NaiveDate), CalendarError> {
    if stg_prices.height() == 0 {
        return Err(CalendarError::EmptyPriceRelation);
    }

    let dates = stg_prices
        .column("date")
        .map_err(|e| CalendarError::Frame(e.to_string()))?
        .date()
        .map_err(|e| CalendarError::Frame(e.to_string()))?;

    let mut min_days: Option<i32> = None;
    let mut max_days: Option<i32> = None;
    for i in 0..dates.len() {
        if let Some(d) = dates.get(i) {
            min_days = Some(min_days.map_or(d, |m| m.min(d)));
            max_days = Some(max_days.map_or(d, |m| m.max(d)));
        }
    }

    // A date column that is all null is as degenerate as an empty relation.
    match (min_days, max_days) {
        (Some(min), Some(max)) => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            Ok((
                epoch + Duration::days(min as i64),
                epoch + Duration::days(max as i64),
            ))
        }
        _ => Err(CalendarError::EmptyPriceRelation),
    }
}

fn calendar_to_dataframe(days: &[CalendarDay]) -> Result<DataFrame, CalendarError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

    let dates: Vec<i32> = days
        .iter()
        .map(|d| (d.date - epoch).num_days() as i32)
        .collect();
    let years: Vec<i32> = days.iter().map(|d| d.year).collect();
    let quarters: Vec<u32> = days.iter().map(|d| d.quarter).collect();
    let months: Vec<u32> = days.iter().map(|d| d.month).collect();
    let day_nums: Vec<u32> = days.iter().map(|d| d.day).collect();
    let dows: Vec<u32> = days.iter().map(|d| d.day_of_week).collect();
    let names: Vec<&str> = days.iter().map(|d| d.day_name).collect();
    let weekends: Vec<bool> = days.iter().map(|d| d.is_weekend).collect();
    let fiscal_years: Vec<i32> = days.iter().map(|d| d.fiscal_year).collect();
    let fiscal_quarters: Vec<u32> = days.iter().map(|d| d.fiscal_quarter).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| CalendarError::Frame(format!("date cast: {e}")))?,
        Column::new("year".into(), years),
        Column::new("quarter".into(), quarters),
        Column::new("month".into(), months),
        Column::new("day".into(), day_nums),
        Column::new("day_of_week".into(), dows),
        Column::new("day_name".into(), names),
        Column::new("is_weekend".into(), weekends),
        Column::new("fiscal_year".into(), fiscal_years),
        Column::new("fiscal_quarter".into(), fiscal_quarters),
    ])
    .map_err(|e| CalendarError::Frame(format!("dataframe creation: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn staged_prices(dates: &[NaiveDate]) -> DataFrame {
        let epoch = ymd(1970, 1, 1);
        let days: Vec<i32> = dates.iter().map(|d| (*d - epoch).num_days() as i32).collect();
        let codes: Vec<&str> = dates.iter().map(|_| "72030").collect();
        let closes: Vec<f64> = dates.iter().map(|_| 100.0).collect();

        DataFrame::new(vec![
            Column::new("company_code".into(), codes),
            Column::new("date".into(), days)
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("close_price".into(), closes),
        ])
        .unwrap()
    }

    #[test]
    fn monday_attributes() {
        let day = CalendarDay::from_date(ymd(2025, 1, 6));

        assert_eq!(day.year, 2025);
        assert_eq!(day.quarter, 1);
        assert_eq!(day.month, 1);
        assert_eq!(day.day, 6);
        assert_eq!(day.day_of_week, 1);
        assert_eq!(day.day_name, "Monday");
        assert!(!day.is_weekend);
        assert_eq!(day.fiscal_year, 2024);
        assert_eq!(day.fiscal_quarter, 4);
    }

    #[test]
    fn weekend_flags_sunday_and_saturday() {
        let saturday = CalendarDay::from_date(ymd(2025, 1, 4));
        let sunday = CalendarDay::from_date(ymd(2025, 1, 5));

        assert_eq!(saturday.day_of_week, 6);
        assert!(saturday.is_weekend);
        assert_eq!(sunday.day_of_week, 0);
        assert!(sunday.is_weekend);
    }

    #[test]
    fn fiscal_year_flips_at_april_first() {
        assert_eq!(fiscal_year(ymd(2024, 3, 31)), 2023);
        assert_eq!(fiscal_year(ymd(2024, 4, 1)), 2024);
        assert_eq!(fiscal_year(ymd(2024, 12, 31)), 2024);
        assert_eq!(fiscal_year(ymd(2025, 1, 1)), 2024);
    }

    #[test]
    fn fiscal_quarter_boundaries() {
        assert_eq!(fiscal_quarter(4), 1);
        assert_eq!(fiscal_quarter(6), 1);
        assert_eq!(fiscal_quarter(7), 2);
        assert_eq!(fiscal_quarter(9), 2);
        assert_eq!(fiscal_quarter(10), 3);
        assert_eq!(fiscal_quarter(12), 3);
        assert_eq!(fiscal_quarter(1), 4);
        assert_eq!(fiscal_quarter(3), 4);
    }

    #[test]
    fn spine_includes_both_ends_and_weekends() {
        // Friday through Monday: the weekend stays in.
        let spine = date_spine(ymd(2025, 1, 3), ymd(2025, 1, 6));
        assert_eq!(
            spine,
            vec![
                ymd(2025, 1, 3),
                ymd(2025, 1, 4),
                ymd(2025, 1, 5),
                ymd(2025, 1, 6)
            ]
        );
    }

    #[test]
    fn single_date_yields_one_row() {
        let dim = build_dim_date(&staged_prices(&[ymd(2025, 1, 6)])).unwrap();
        assert_eq!(dim.height(), 1);
    }

    #[test]
    fn bounds_are_derived_not_filtered() {
        // Only two observations, four days apart: the spine fills the gap.
        let dim = build_dim_date(&staged_prices(&[ymd(2025, 1, 10), ymd(2025, 1, 6)])).unwrap();

        assert_eq!(dim.height(), 5);
        let dows = dim.column("day_of_week").unwrap().u32().unwrap();
        assert_eq!(dows.get(0), Some(1)); // Monday the 6th comes first
    }

    #[test]
    fn empty_relation_is_an_error() {
        let empty = staged_prices(&[]);
        assert!(matches!(
            build_dim_date(&empty),
            Err(CalendarError::EmptyPriceRelation)
        ));
    }
}
