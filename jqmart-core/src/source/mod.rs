//! Raw data acquisition — the provider client, the extraction loops, and the
//! synthetic snapshot generator for offline development.

pub mod client;
pub mod extract;
pub mod records;
pub mod synthetic;

pub use client::{JQuantsClient, RetryConfig, SourceError, API_KEY_ENV};
pub use extract::{
    extract_listed_info, extract_stock_prices, ExtractProgress, ExtractionConfig, StdoutProgress,
};
