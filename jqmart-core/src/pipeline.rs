//! The transformation DAG.
//!
//! Stages run in a fixed topological order with typed DataFrame inputs and
//! outputs — the dependency graph lives here explicitly instead of being
//! inferred from table references:
//!
//! ```text
//! raw.listed_info  ── stage_listed_info ── dim_company ──┐
//! raw.stock_prices ── stage_stock_prices ─┬─ dim_date    ├── fct_stock_prices
//!                                         └──────────────┘
//! ```
//!
//! All marts are built in memory before anything is written, so a fatal
//! error in any stage leaves the warehouse untouched — no partial output is
//! ever materialized.

use polars::prelude::*;
use serde::Serialize;

use crate::marts::calendar::{build_dim_date, CalendarError};
use crate::marts::company::{build_dim_company, CompanyError};
use crate::marts::prices::{build_fct_stock_prices, FactError};
use crate::staging::{stage_listed_info, stage_stock_prices, StagingError};
use crate::store::{SchemaName, StoreError, TableMeta, Warehouse};

/// Raw input relations, as landed by the extract collaborator.
pub struct RawInputs {
    pub listed_info: DataFrame,
    pub stock_prices: DataFrame,
}

/// The star schema for one run, plus its accounting.
#[derive(Debug)]
pub struct MartTables {
    pub dim_date: DataFrame,
    pub dim_company: DataFrame,
    pub fct_stock_prices: DataFrame,
    pub report: BuildReport,
}

/// Pipeline stages, listed in topological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    StageListedInfo,
    StageStockPrices,
    DimDate,
    DimCompany,
    FctStockPrices,
}

impl Stage {
    pub fn output_name(&self) -> &'static str {
        match self {
            Stage::StageListedInfo => "stg_listed_info",
            Stage::StageStockPrices => "stg_stock_prices",
            Stage::DimDate => "dim_date",
            Stage::DimCompany => "dim_company",
            Stage::FctStockPrices => "fct_stock_prices",
        }
    }
}

/// Row accounting for one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub rows_in: usize,
    pub rows_out: usize,
}

/// Run-level accounting: per-stage row counts plus the two quality signals
/// the transformation deliberately tolerates instead of raising.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub stages: Vec<StageReport>,
    /// Staged price rows dropped for lack of a company dimension row.
    pub dropped_fact_rows: usize,
    /// Duplicate company codes collapsed while building the dimension.
    pub duplicate_company_codes: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Company(#[from] CompanyError),

    #[error(transparent)]
    Fact(#[from] FactError),
}

/// Run the full transformation over one raw snapshot.
pub fn run_pipeline(raw: &RawInputs) -> Result<MartTables, PipelineError> {
    let mut stages = Vec::new();

    let stg_listed = stage_listed_info(&raw.listed_info)?;
    stages.push(StageReport {
        stage: Stage::StageListedInfo,
        rows_in: raw.listed_info.height(),
        rows_out: stg_listed.height(),
    });

    let stg_prices = stage_stock_prices(&raw.stock_prices)?;
    stages.push(StageReport {
        stage: Stage::StageStockPrices,
        rows_in: raw.stock_prices.height(),
        rows_out: stg_prices.height(),
    });

    let dim_date = build_dim_date(&stg_prices)?;
    stages.push(StageReport {
        stage: Stage::DimDate,
        rows_in: stg_prices.height(),
        rows_out: dim_date.height(),
    });

    let company = build_dim_company(&stg_listed)?;
    stages.push(StageReport {
        stage: Stage::DimCompany,
        rows_in: stg_listed.height(),
        rows_out: company.table.height(),
    });

    let fact = build_fct_stock_prices(&stg_prices, &company.table)?;
    stages.push(StageReport {
        stage: Stage::FctStockPrices,
        rows_in: stg_prices.height(),
        rows_out: fact.table.height(),
    });

    if fact.dropped_rows > 0 {
        log::warn!(
            "fct_stock_prices: dropped {} price rows with no matching company dimension row",
            fact.dropped_rows
        );
    }

    Ok(MartTables {
        dim_date,
        dim_company: company.table,
        fct_stock_prices: fact.table,
        report: BuildReport {
            stages,
            dropped_fact_rows: fact.dropped_rows,
            duplicate_company_codes: company.duplicates_collapsed,
        },
    })
}

/// Write all three marts to the warehouse, replacing any previous run.
///
/// Call this only with a fully built [`MartTables`] — the separation between
/// building and materializing is what keeps failed runs from leaving partial
/// output behind.
pub fn materialize_marts(
    warehouse: &Warehouse,
    marts: &MartTables,
) -> Result<Vec<TableMeta>, StoreError> {
    let tables = [
        ("dim_date", &marts.dim_date),
        ("dim_company", &marts.dim_company),
        ("fct_stock_prices", &marts.fct_stock_prices),
    ];

    let mut metas = Vec::with_capacity(tables.len());
    for (name, df) in tables {
        metas.push(warehouse.write_table(SchemaName::Marts, name, df)?);
    }
    Ok(metas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_report_in_topological_order() {
        let order = [
            Stage::StageListedInfo,
            Stage::StageStockPrices,
            Stage::DimDate,
            Stage::DimCompany,
            Stage::FctStockPrices,
        ];
        let names: Vec<&str> = order.iter().map(|s| s.output_name()).collect();
        assert_eq!(
            names,
            [
                "stg_listed_info",
                "stg_stock_prices",
                "dim_date",
                "dim_company",
                "fct_stock_prices"
            ]
        );
    }
}
