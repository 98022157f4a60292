//! Typed raw records for the provider endpoints.
//!
//! Field renames mirror the provider's short codes one-to-one, and the
//! conversion functions keep those names, so the `raw.*` tables store exactly
//! what the API returned. The staging normalizers are the only place the
//! short codes get renamed.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// One row of the listed-company master (`/equities/master`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListedInfoRecord {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "CoName")]
    pub co_name: String,
    #[serde(rename = "CoNameEn")]
    pub co_name_en: String,
    #[serde(rename = "S17")]
    pub s17: String,
    #[serde(rename = "S17Nm")]
    pub s17_nm: String,
    #[serde(rename = "S33")]
    pub s33: String,
    #[serde(rename = "S33Nm")]
    pub s33_nm: String,
    #[serde(rename = "ScaleCat")]
    pub scale_cat: String,
    #[serde(rename = "Mkt")]
    pub mkt: String,
    #[serde(rename = "MktNm")]
    pub mkt_nm: String,
}

/// One row of the daily bar endpoint (`/equities/bars/daily`).
///
/// Measures are nullable: the provider ships null OHLC for halted names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBarRecord {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "O")]
    pub open: Option<f64>,
    #[serde(rename = "H")]
    pub high: Option<f64>,
    #[serde(rename = "L")]
    pub low: Option<f64>,
    #[serde(rename = "C")]
    pub close: Option<f64>,
    #[serde(rename = "Vo")]
    pub volume: Option<f64>,
    #[serde(rename = "Va")]
    pub turnover_value: Option<f64>,
    #[serde(rename = "AdjFactor")]
    pub adj_factor: Option<f64>,
    #[serde(rename = "AdjO")]
    pub adj_open: Option<f64>,
    #[serde(rename = "AdjH")]
    pub adj_high: Option<f64>,
    #[serde(rename = "AdjL")]
    pub adj_low: Option<f64>,
    #[serde(rename = "AdjC")]
    pub adj_close: Option<f64>,
}

/// Convert listed-info records to the provider-shaped `raw.listed_info` frame.
pub fn listed_info_to_dataframe(records: &[ListedInfoRecord]) -> PolarsResult<DataFrame> {
    let codes: Vec<&str> = records.iter().map(|r| r.code.as_str()).collect();
    let co_names: Vec<&str> = records.iter().map(|r| r.co_name.as_str()).collect();
    let co_names_en: Vec<&str> = records.iter().map(|r| r.co_name_en.as_str()).collect();
    let s17s: Vec<&str> = records.iter().map(|r| r.s17.as_str()).collect();
    let s17_nms: Vec<&str> = records.iter().map(|r| r.s17_nm.as_str()).collect();
    let s33s: Vec<&str> = records.iter().map(|r| r.s33.as_str()).collect();
    let s33_nms: Vec<&str> = records.iter().map(|r| r.s33_nm.as_str()).collect();
    let scale_cats: Vec<&str> = records.iter().map(|r| r.scale_cat.as_str()).collect();
    let mkts: Vec<&str> = records.iter().map(|r| r.mkt.as_str()).collect();
    let mkt_nms: Vec<&str> = records.iter().map(|r| r.mkt_nm.as_str()).collect();
    let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();

    DataFrame::new(vec![
        Column::new("Code".into(), codes),
        Column::new("CoName".into(), co_names),
        Column::new("CoNameEn".into(), co_names_en),
        Column::new("S17".into(), s17s),
        Column::new("S17Nm".into(), s17_nms),
        Column::new("S33".into(), s33s),
        Column::new("S33Nm".into(), s33_nms),
        Column::new("ScaleCat".into(), scale_cats),
        Column::new("Mkt".into(), mkts),
        Column::new("MktNm".into(), mkt_nms),
        Column::new("Date".into(), dates),
    ])
}

/// Convert daily bar records to the provider-shaped `raw.stock_prices` frame.
pub fn daily_bars_to_dataframe(records: &[DailyBarRecord]) -> PolarsResult<DataFrame> {
    let codes: Vec<&str> = records.iter().map(|r| r.code.as_str()).collect();
    let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
    let opens: Vec<Option<f64>> = records.iter().map(|r| r.open).collect();
    let highs: Vec<Option<f64>> = records.iter().map(|r| r.high).collect();
    let lows: Vec<Option<f64>> = records.iter().map(|r| r.low).collect();
    let closes: Vec<Option<f64>> = records.iter().map(|r| r.close).collect();
    let volumes: Vec<Option<f64>> = records.iter().map(|r| r.volume).collect();
    let turnovers: Vec<Option<f64>> = records.iter().map(|r| r.turnover_value).collect();
    let adj_factors: Vec<Option<f64>> = records.iter().map(|r| r.adj_factor).collect();
    let adj_opens: Vec<Option<f64>> = records.iter().map(|r| r.adj_open).collect();
    let adj_highs: Vec<Option<f64>> = records.iter().map(|r| r.adj_high).collect();
    let adj_lows: Vec<Option<f64>> = records.iter().map(|r| r.adj_low).collect();
    let adj_closes: Vec<Option<f64>> = records.iter().map(|r| r.adj_close).collect();

    DataFrame::new(vec![
        Column::new("Code".into(), codes),
        Column::new("Date".into(), dates),
        Column::new("O".into(), opens),
        Column::new("H".into(), highs),
        Column::new("L".into(), lows),
        Column::new("C".into(), closes),
        Column::new("Vo".into(), volumes),
        Column::new("Va".into(), turnovers),
        Column::new("AdjFactor".into(), adj_factors),
        Column::new("AdjO".into(), adj_opens),
        Column::new("AdjH".into(), adj_highs),
        Column::new("AdjL".into(), adj_lows),
        Column::new("AdjC".into(), adj_closes),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LISTED_INFO, STOCK_PRICES};

    fn sample_bar() -> DailyBarRecord {
        serde_json::from_str(
            r#"{"Code": "72030", "Date": "2025-01-06",
                "O": 2500.0, "H": 2550.0, "L": 2480.0, "C": 2530.0,
                "Vo": 1200000.0, "Va": 3036000000.0, "AdjFactor": 1.0,
                "AdjO": 2500.0, "AdjH": 2550.0, "AdjL": 2480.0, "AdjC": 2530.0}"#,
        )
        .unwrap()
    }

    #[test]
    fn bar_record_uses_provider_field_names() {
        let bar = sample_bar();
        assert_eq!(bar.code, "72030");
        assert_eq!(bar.date, "2025-01-06");
        assert_eq!(bar.close, Some(2530.0));
    }

    #[test]
    fn halted_name_deserializes_with_null_measures() {
        let bar: DailyBarRecord = serde_json::from_str(
            r#"{"Code": "72030", "Date": "2025-01-06",
                "O": null, "H": null, "L": null, "C": null,
                "Vo": 0.0, "Va": 0.0, "AdjFactor": 1.0,
                "AdjO": null, "AdjH": null, "AdjL": null, "AdjC": null}"#,
        )
        .unwrap();
        assert!(bar.close.is_none());
        assert_eq!(bar.volume, Some(0.0));
    }

    #[test]
    fn raw_price_frame_satisfies_the_staging_contract() {
        let df = daily_bars_to_dataframe(&[sample_bar()]).unwrap();
        assert_eq!(df.height(), 1);
        assert!(STOCK_PRICES.validate(&df).is_ok());
    }

    #[test]
    fn raw_listed_frame_satisfies_the_staging_contract() {
        let record: ListedInfoRecord = serde_json::from_str(
            r#"{"Date": "2025-01-06", "Code": "72030",
                "CoName": "トヨタ自動車", "CoNameEn": "Toyota Motor",
                "S17": "6", "S17Nm": "自動車・輸送機",
                "S33": "3700", "S33Nm": "輸送用機器",
                "ScaleCat": "TOPIX Core30", "Mkt": "0111", "MktNm": "プライム"}"#,
        )
        .unwrap();

        let df = listed_info_to_dataframe(&[record]).unwrap();
        assert_eq!(df.height(), 1);
        assert!(LISTED_INFO.validate(&df).is_ok());
    }
}
