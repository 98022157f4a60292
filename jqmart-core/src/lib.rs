//! JQMart Core — star-schema transformation pipeline for Japanese equities.
//!
//! This crate turns two raw provider relations (`raw.listed_info`,
//! `raw.stock_prices`) into a dimensional model:
//! - Staging normalizers: provider short codes → stable typed columns
//! - Calendar builder: a gap-free daily `dim_date` spanning the observed range
//! - Company dimension: one row per company code
//! - Fact builder: price rows filtered to valid dimension keys
//!
//! Around the core sit the collaborators the pipeline needs to be runnable:
//! the J-Quants source client (`source`), the parquet warehouse (`store`),
//! and the explicit stage DAG (`pipeline`). Each run is a full refresh — the
//! whole model is recomputed from the current raw snapshot and every output
//! table is replaced.

pub mod marts;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod staging;
pub mod store;
