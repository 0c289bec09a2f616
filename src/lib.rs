//! Sales analytics: validate a tabular sales dataset, filter it, and derive
//! totals, grouped rollups, a linear trend and goal attainment tiers.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod output;
pub mod report;

pub use config::Config;
pub use data::model::{Dataset, Record, Schema, Value, ValueKind};
pub use error::{AnalyticsError, Result};
pub use report::{run, ReportSummary};
