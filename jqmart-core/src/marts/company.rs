//! Company dimension builder.
//!
//! Projects the staged listed-info relation into `dim_company`. The staged
//! column set is already the dimension column set; the builder's job is the
//! key discipline: `company_code` must be unique, so duplicate codes in the
//! snapshot are collapsed to their first occurrence and the collapsed count
//! is surfaced instead of letting downstream joins fan out silently.

use polars::prelude::*;

use crate::schema::LISTED_INFO;

#[derive(Debug, thiserror::Error)]
pub enum CompanyError {
    #[error("company dimension build failed: {0}")]
    Frame(String),
}

/// `dim_company` plus how many duplicate company codes were collapsed.
#[derive(Debug)]
pub struct CompanyDimension {
    pub table: DataFrame,
    pub duplicates_collapsed: usize,
}

/// Build `dim_company` from the staged listed-info relation.
pub fn build_dim_company(stg_listed_info: &DataFrame) -> Result<CompanyDimension, CompanyError> {
    let rows_in = stg_listed_info.height();

    let exprs: Vec<Expr> = LISTED_INFO.staging_columns().map(col).collect();
    let table = stg_listed_info
        .clone()
        .lazy()
        .select(exprs)
        .unique_stable(
            Some(vec!["company_code".into()]),
            UniqueKeepStrategy::First,
        )
        .collect()
        .map_err(|e| CompanyError::Frame(e.to_string()))?;

    let duplicates_collapsed = rows_in - table.height();
    if duplicates_collapsed > 0 {
        log::warn!(
            "dim_company: collapsed {duplicates_collapsed} duplicate company codes in the raw snapshot"
        );
    }

    Ok(CompanyDimension {
        table,
        duplicates_collapsed,
    })
}
