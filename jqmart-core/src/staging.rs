//! Staging normalizers — raw provider relations to typed staging relations.
//!
//! One normalizer per raw source, both driven by the static mappings in
//! [`crate::schema`]. A normalizer is a pure projection: rename through the
//! mapping, coerce the trading-date column, keep every row. No filtering,
//! no deduplication, no aggregation.

use polars::prelude::*;

use crate::schema::{SchemaError, SourceSchema, LISTED_INFO, STOCK_PRICES};

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("staging '{table}' failed: {message}")]
    Frame {
        table: &'static str,
        message: String,
    },
}

/// Normalize `raw.listed_info` into `stg_listed_info`.
///
/// Pass-through rename; the listed-info fields are all categorical.
pub fn stage_listed_info(raw: &DataFrame) -> Result<DataFrame, StagingError> {
    normalize(raw, &LISTED_INFO)
}

/// Normalize `raw.stock_prices` into `stg_stock_prices`.
///
/// Renames the price/volume columns unchanged and coerces the trading date
/// from a `YYYY-MM-DD` string to a `Date` column.
pub fn stage_stock_prices(raw: &DataFrame) -> Result<DataFrame, StagingError> {
    normalize(raw, &STOCK_PRICES)
}

fn normalize(raw: &DataFrame, schema: &SourceSchema) -> Result<DataFrame, StagingError> {
    schema.validate(raw)?;

    let exprs: Vec<Expr> = schema
        .columns
        .iter()
        .map(|&(source, staged)| {
            if Some(source) == schema.date_column {
                col(source)
                    .str()
                    .to_date(StrptimeOptions {
                        format: Some("%Y-%m-%d".into()),
                        ..Default::default()
                    })
                    .alias(staged)
            } else {
                col(source).alias(staged)
            }
        })
        .collect();

    raw.clone()
        .lazy()
        .select(exprs)
        .collect()
        .map_err(|e| StagingError::Frame {
            table: schema.table,
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_prices() -> DataFrame {
        df!(
            "Code" => &["72030", "99840"],
            "Date" => &["2025-01-06", "2025-01-07"],
            "O" => &[2500.0, 8800.0],
            "H" => &[2550.0, 8950.0],
            "L" => &[2480.0, 8750.0],
            "C" => &[2530.0, 8900.0],
            "Vo" => &[1_200_000.0, 800_000.0],
            "Va" => &[3_036_000_000.0, 7_120_000_000.0],
            "AdjFactor" => &[1.0, 1.0],
            "AdjO" => &[2500.0, 8800.0],
            "AdjH" => &[2550.0, 8950.0],
            "AdjL" => &[2480.0, 8750.0],
            "AdjC" => &[2530.0, 8900.0],
        )
        .unwrap()
    }

    fn raw_listed() -> DataFrame {
        df!(
            "Code" => &["72030", "99840"],
            "CoName" => &["トヨタ自動車", "ソフトバンクグループ"],
            "CoNameEn" => &["Toyota Motor", "SoftBank Group"],
            "S17" => &["6", "10"],
            "S17Nm" => &["自動車・輸送機", "情報通信・サービスその他"],
            "S33" => &["3700", "5250"],
            "S33Nm" => &["輸送用機器", "情報・通信業"],
            "ScaleCat" => &["TOPIX Core30", "TOPIX Core30"],
            "Mkt" => &["0111", "0111"],
            "MktNm" => &["プライム", "プライム"],
            "Date" => &["2025-01-06", "2025-01-06"],
        )
        .unwrap()
    }

    #[test]
    fn listed_info_renames_and_preserves_rows() {
        let staged = stage_listed_info(&raw_listed()).unwrap();

        assert_eq!(staged.height(), 2);
        let names: Vec<&str> = staged
            .get_column_names()
            .iter()
            .map(|s| s.as_str())
            .collect();
        let expected: Vec<&str> = LISTED_INFO.staging_columns().collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn listed_info_drops_the_snapshot_date() {
        let staged = stage_listed_info(&raw_listed()).unwrap();
        assert!(staged.column("Date").is_err());
        assert!(staged.column("snapshot_date").is_err());
    }

    #[test]
    fn prices_coerce_date_to_date_type() {
        let staged = stage_stock_prices(&raw_prices()).unwrap();

        assert_eq!(staged.height(), 2);
        assert_eq!(staged.column("date").unwrap().dtype(), &DataType::Date);
        assert_eq!(
            staged.column("open_price").unwrap().dtype(),
            &DataType::Float64
        );
    }

    #[test]
    fn prices_keep_null_measures() {
        let raw = df!(
            "Code" => &["72030"],
            "Date" => &["2025-01-06"],
            "O" => &[Option::<f64>::None],
            "H" => &[Option::<f64>::None],
            "L" => &[Option::<f64>::None],
            "C" => &[Option::<f64>::None],
            "Vo" => &[Some(0.0)],
            "Va" => &[Some(0.0)],
            "AdjFactor" => &[Some(1.0)],
            "AdjO" => &[Option::<f64>::None],
            "AdjH" => &[Option::<f64>::None],
            "AdjL" => &[Option::<f64>::None],
            "AdjC" => &[Option::<f64>::None],
        )
        .unwrap();

        let staged = stage_stock_prices(&raw).unwrap();
        assert_eq!(staged.height(), 1);
        assert_eq!(staged.column("open_price").unwrap().null_count(), 1);
    }

    #[test]
    fn missing_source_column_fails_fast() {
        let raw = raw_prices().drop("Vo").unwrap();
        let err = stage_stock_prices(&raw).unwrap_err();
        assert!(err.to_string().contains("Vo"));
    }
}
