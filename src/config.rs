//! Run configuration.
//!
//! Stored as pretty JSON. Every option has a default, so a partial file is
//! valid and unknown keys are ignored.
//!
//! # Example
//! ```json
//! {
//!   "input_file": "sales.csv",
//!   "measure_column": "Sales",
//!   "filter_threshold": 1000,
//!   "filters": [{ "column": "Region", "in": ["North", "South"] }],
//!   "group_keys": ["Region"],
//!   "date_column": "Date",
//!   "target_column": "Goal",
//!   "performance_tiers": [0.8, 1.0]
//! }
//! ```

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::analysis::group::GroupSort;
use crate::analysis::performance::TierThresholds;
use crate::data::filter::{Comparison, FilterSpec, Predicate};
use crate::data::validate::ValidationRules;
use crate::error::{AnalyticsError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dataset to load (.csv, .json or .parquet)
    pub input_file: PathBuf,

    /// Where the filtered rows are written
    pub output_file: PathBuf,

    /// Where the JSON report is written
    pub stats_file: PathBuf,

    /// Column naming the customer or entity of a row
    pub entity_column: String,

    /// Numeric column that is filtered and aggregated
    pub measure_column: String,

    /// Columns that must exist in the dataset
    pub required_columns: Vec<String>,

    /// Column rejected when it holds negative values
    pub range_checked_column: Option<String>,

    /// Treat an empty dataset as an error
    pub strict: bool,

    /// Keep rows whose measure is strictly greater than this
    pub filter_threshold: Option<f64>,

    /// Extra predicates, applied after the threshold
    pub filters: FilterSpec,

    /// Categorical columns forming the group key, in order
    pub group_keys: Vec<String>,

    pub group_sort: GroupSort,

    /// Date column for the trend; row order is used when unset
    pub date_column: Option<String>,

    /// Goal column compared with the measure; skipped when unset
    pub target_column: Option<String>,

    /// Ascending `[near, above]` goal ratios
    pub performance_tiers: Vec<f64>,

    /// strftime pattern of the report timestamp
    pub date_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_file: PathBuf::from("sales.csv"),
            output_file: PathBuf::from("sales_filtered.csv"),
            stats_file: PathBuf::from("sales_report.json"),
            entity_column: "Customer".to_string(),
            measure_column: "Sales".to_string(),
            required_columns: vec!["Customer".to_string(), "Sales".to_string()],
            range_checked_column: Some("Sales".to_string()),
            strict: true,
            filter_threshold: Some(1000.0),
            filters: FilterSpec::default(),
            group_keys: Vec::new(),
            group_sort: GroupSort::default(),
            date_column: None,
            target_column: None,
            performance_tiers: vec![0.8, 1.0],
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| AnalyticsError::configuration(format!("invalid config: {e}")))
    }

    /// Read `path`, or write the defaults there when it does not exist yet.
    pub fn load_or_create(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let config = Config::from_json(&text)?;
            log::info!("configuration loaded from {}", path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path)?;
            log::info!("default configuration written to {}", path.display());
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self).context("serializing config")?;
        std::fs::write(path, text).with_context(|| format!("writing config {}", path.display()))
    }

    /// Reject options that cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.measure_column.trim().is_empty() {
            return Err(AnalyticsError::configuration("measure_column is empty"));
        }
        if self.entity_column.trim().is_empty() {
            return Err(AnalyticsError::configuration("entity_column is empty"));
        }
        if let Some(t) = self.filter_threshold {
            if !t.is_finite() {
                return Err(AnalyticsError::configuration(format!(
                    "filter_threshold must be finite, got {t}"
                )));
            }
        }
        if self.group_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(AnalyticsError::configuration("group_keys contains an empty name"));
        }
        self.tier_thresholds()?;
        validate_date_format(&self.date_format)
    }

    pub fn tier_thresholds(&self) -> Result<TierThresholds> {
        TierThresholds::from_list(&self.performance_tiers)
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules {
            required_columns: self.required_columns.clone(),
            range_checked_column: self.range_checked_column.clone(),
            strict: self.strict,
        }
    }

    /// The threshold predicate on the measure, followed by `filters`.
    pub fn filter_spec(&self) -> FilterSpec {
        let mut predicates = Vec::with_capacity(self.filters.predicates.len() + 1);
        if let Some(t) = self.filter_threshold {
            predicates.push(Predicate::compare(
                self.measure_column.clone(),
                Comparison::Gt,
                t,
            ));
        }
        predicates.extend(self.filters.predicates.iter().cloned());
        FilterSpec::new(predicates)
    }
}

fn validate_date_format(format: &str) -> Result<()> {
    if format.is_empty() {
        return Err(AnalyticsError::configuration("date_format is empty"));
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(AnalyticsError::configuration(format!(
            "date_format '{format}' is not a valid strftime pattern"
        )));
    }
    // Offset and zone items parse but cannot render a naive timestamp.
    let mut rendered = String::new();
    if write!(rendered, "{}", NaiveDateTime::default().format(format)).is_err() {
        return Err(AnalyticsError::configuration(format!(
            "date_format '{format}' cannot format a local timestamp without a time zone"
        )));
    }
    Ok(())
}
