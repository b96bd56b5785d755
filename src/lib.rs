//! Trend, record and streak statistics of climate-anomaly time series.
//!
//! A table is parsed row by row ([`row`]), assembled into a [`series::Series`]
//! and handed to independent analyses: OLS trends ([`regression`],
//! [`segment`]), running records and their gaps ([`records`]) and runs of
//! anomalous periods ([`streaks`]).

pub mod analysis;
pub mod config;
pub mod error;
pub mod manager;
pub mod records;
pub mod regression;
pub mod row;
pub mod segment;
pub mod series;
pub mod stats;
pub mod streaks;

pub use error::{Degeneracy, EngineError, EngineResult, RowFault};
pub use regression::{RegressionResult, fit};
pub use series::{Series, SeriesBuilder};
