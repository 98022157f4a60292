//! Source schema contracts and the raw→staging column mappings.
//!
//! The provider ships short-coded column names (`CoName`, `S17`, `Vo`, ...).
//! Each mapping below is the single place that knows them: the staging
//! normalizers select through the mapping, so upstream schema drift is
//! absorbed here and nowhere else. The mapping is a contract, not a
//! best-effort rename — a missing source column fails the run.

use polars::prelude::*;

/// One raw source relation: its table name and the source→staging renames.
pub struct SourceSchema {
    /// Table name within the warehouse `raw` schema.
    pub table: &'static str,
    /// `(source_column, staging_column)` pairs, in staging column order.
    pub columns: &'static [(&'static str, &'static str)],
    /// Source column holding a `YYYY-MM-DD` string to coerce to `Date`.
    pub date_column: Option<&'static str>,
}

/// `raw.listed_info` → `stg_listed_info` (provider API v2 master endpoint).
///
/// Pass-through rename only. The raw snapshot `Date` column is not part of
/// the staged company record.
pub const LISTED_INFO: SourceSchema = SourceSchema {
    table: "listed_info",
    columns: &[
        ("Code", "company_code"),
        ("CoName", "company_name"),
        ("CoNameEn", "company_name_english"),
        ("S17", "sector_17_code"),
        ("S17Nm", "sector_17_name"),
        ("S33", "sector_33_code"),
        ("S33Nm", "sector_33_name"),
        ("ScaleCat", "scale_category"),
        ("Mkt", "market_code"),
        ("MktNm", "market_name"),
    ],
    date_column: None,
};

/// `raw.stock_prices` → `stg_stock_prices` (provider API v2 daily bars).
pub const STOCK_PRICES: SourceSchema = SourceSchema {
    table: "stock_prices",
    columns: &[
        ("Code", "company_code"),
        ("Date", "date"),
        ("O", "open_price"),
        ("H", "high_price"),
        ("L", "low_price"),
        ("C", "close_price"),
        ("Vo", "volume"),
        ("Va", "turnover_value"),
        ("AdjFactor", "adjustment_factor"),
        ("AdjO", "adjusted_open"),
        ("AdjH", "adjusted_high"),
        ("AdjL", "adjusted_low"),
        ("AdjC", "adjusted_close"),
    ],
    date_column: Some("Date"),
};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("source table '{table}' is missing expected column '{column}'")]
    MissingColumn {
        table: &'static str,
        column: String,
    },
}

impl SourceSchema {
    /// Staging column names, in output order.
    pub fn staging_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|&(_, staged)| staged)
    }

    /// Check that every source column the mapping depends on is present.
    pub fn validate(&self, df: &DataFrame) -> Result<(), SchemaError> {
        let actual = df.schema();
        for (source, _) in self.columns {
            if !actual.contains(source) {
                return Err(SchemaError::MissingColumn {
                    table: self.table,
                    column: (*source).to_string(),
                });
            }
        }
        Ok(())
    }
}
