//! Fact table builder.
//!
//! Restricts the staged price relation to rows whose company code exists in
//! the company dimension. This is a filter-join, not a validation: a row
//! with an unknown code is dropped, never raised, which tolerates
//! reference-data lag between the price history and the listed-info
//! snapshot. The drop count is returned so the loss is observable.

use std::collections::HashSet;

use polars::prelude::*;

/// Fact column set: dimension keys plus the measures.
pub const FCT_STOCK_PRICES_COLUMNS: &[&str] = &[
    "company_code",
    "date",
    "open_price",
    "high_price",
    "low_price",
    "close_price",
    "volume",
    "turnover_value",
    "adjusted_close",
];

#[derive(Debug, thiserror::Error)]
pub enum FactError {
    #[error("fact build failed: {0}")]
    Frame(String),
}

/// `fct_stock_prices` plus how many staged rows had no dimension match.
#[derive(Debug)]
pub struct FactTable {
    pub table: DataFrame,
    pub dropped_rows: usize,
}

/// Build `fct_stock_prices` from the staged price relation and the company
/// dimension. Row order of the surviving rows is preserved.
pub fn build_fct_stock_prices(
    stg_prices: &DataFrame,
    dim_company: &DataFrame,
) -> Result<FactTable, FactError> {
    let frame = |e: PolarsError| FactError::Frame(e.to_string());

    // Key set of valid company codes from the dimension.
    let dim_codes = dim_company.column("company_code").map_err(frame)?;
    let dim_codes = dim_codes.str().map_err(frame)?;
    let mut valid: HashSet<&str> = HashSet::with_capacity(dim_codes.len());
    for code in dim_codes.into_iter().flatten() {
        valid.insert(code);
    }

    let fact_codes = stg_prices.column("company_code").map_err(frame)?;
    let fact_codes = fact_codes.str().map_err(frame)?;
    let mask: BooleanChunked = fact_codes
        .into_iter()
        .map(|code| Some(code.is_some_and(|c| valid.contains(c))))
        .collect();

    let rows_in = stg_prices.height();
    let table = stg_prices
        .select(FCT_STOCK_PRICES_COLUMNS.iter().copied())
        .map_err(frame)?
        .filter(&mask)
        .map_err(frame)?;
    let dropped_rows = rows_in - table.height();

    Ok(FactTable {
        table,
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn staged_prices(codes: &[&str]) -> DataFrame {
        let n = codes.len();
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let base = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let days: Vec<i32> = (0..n)
            .map(|i| ((base - epoch).num_days() + i as i64) as i32)
            .collect();

        DataFrame::new(vec![
            Column::new("company_code".into(), codes.to_vec()),
            Column::new("date".into(), days)
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("open_price".into(), vec![100.0; n]),
            Column::new("high_price".into(), vec![105.0; n]),
            Column::new("low_price".into(), vec![99.0; n]),
            Column::new("close_price".into(), vec![103.0; n]),
            Column::new("volume".into(), vec![1000.0; n]),
            Column::new("turnover_value".into(), vec![103_000.0; n]),
            Column::new("adjustment_factor".into(), vec![1.0; n]),
            Column::new("adjusted_open".into(), vec![100.0; n]),
            Column::new("adjusted_high".into(), vec![105.0; n]),
            Column::new("adjusted_low".into(), vec![99.0; n]),
            Column::new("adjusted_close".into(), vec![103.0; n]),
        ])
        .unwrap()
    }

    fn dim_company(codes: &[&str]) -> DataFrame {
        df!("company_code" => codes).unwrap()
    }

    #[test]
    fn unknown_codes_are_dropped_silently() {
        let fact =
            build_fct_stock_prices(&staged_prices(&["A", "B", "C"]), &dim_company(&["A", "B"]))
                .unwrap();

        assert_eq!(fact.table.height(), 2);
        assert_eq!(fact.dropped_rows, 1);

        let codes = fact.table.column("company_code").unwrap();
        let codes = codes.str().unwrap();
        assert_eq!(codes.get(0), Some("A"));
        assert_eq!(codes.get(1), Some("B"));
    }

    #[test]
    fn all_codes_known_drops_nothing() {
        let fact =
            build_fct_stock_prices(&staged_prices(&["A", "B"]), &dim_company(&["A", "B"])).unwrap();

        assert_eq!(fact.table.height(), 2);
        assert_eq!(fact.dropped_rows, 0);
    }

    #[test]
    fn fact_projects_the_published_column_set() {
        let fact = build_fct_stock_prices(&staged_prices(&["A"]), &dim_company(&["A"])).unwrap();

        let names: Vec<&str> = fact
            .table
            .get_column_names()
            .iter()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(names, FCT_STOCK_PRICES_COLUMNS);
        // The adjustment inputs stay behind in staging.
        assert!(fact.table.column("adjustment_factor").is_err());
    }
}
