//! Mart builders — the dimension and fact tables of the star schema.

pub mod calendar;
pub mod company;
pub mod prices;

pub use calendar::{build_dim_date, CalendarDay, CalendarError};
pub use company::{build_dim_company, CompanyDimension, CompanyError};
pub use prices::{build_fct_stock_prices, FactError, FactTable};
