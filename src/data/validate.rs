use std::collections::HashSet;

use log::{info, warn};
use serde::Serialize;

use super::model::{Dataset, Value};
use crate::error::{AnalyticsError, Result};

/// How many offending values a range error carries.
const RANGE_SAMPLE: usize = 5;

/// What a dataset must satisfy before it enters the pipeline.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub required_columns: Vec<String>,
    /// Column checked for negative values. Skipped when absent from the data.
    pub range_checked_column: Option<String>,
    /// Reject empty datasets.
    pub strict: bool,
}

/// Non-fatal findings of a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub records: usize,
    /// Rows identical to an earlier row across every column. Kept, not removed.
    pub duplicate_rows: usize,
}

/// Check structure and values of `dataset`. Never mutates it.
///
/// Checks run in order and stop at the first failing one:
/// * required columns (all missing names reported together)
/// * emptiness, when `strict`
/// * no negative values in the range-checked column
///
/// Duplicate rows only produce a warning.
pub fn validate(dataset: &Dataset, rules: &ValidationRules) -> Result<ValidationReport> {
    let missing: Vec<String> = rules
        .required_columns
        .iter()
        .filter(|name| !dataset.schema().contains(name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(AnalyticsError::Schema { missing });
    }

    if rules.strict && dataset.is_empty() {
        return Err(AnalyticsError::MissingData("dataset is empty".into()));
    }

    if let Some(column) = &rules.range_checked_column {
        if let Some(idx) = dataset.schema().index_of(column) {
            let negatives: Vec<f64> = dataset
                .records()
                .iter()
                .filter_map(|r| r.number(idx))
                .filter(|v| *v < 0.0)
                .collect();
            if !negatives.is_empty() {
                return Err(AnalyticsError::ValueRange {
                    column: column.clone(),
                    count: negatives.len(),
                    sample: negatives.into_iter().take(RANGE_SAMPLE).collect(),
                });
            }
        }
    }

    let duplicate_rows = count_duplicates(dataset);
    if duplicate_rows > 0 {
        warn!("found {duplicate_rows} duplicate row(s)");
    }

    info!("validation passed for {} record(s)", dataset.len());
    Ok(ValidationReport {
        records: dataset.len(),
        duplicate_rows,
    })
}

fn count_duplicates(dataset: &Dataset) -> usize {
    let mut seen: HashSet<&[Value]> = HashSet::with_capacity(dataset.len());
    dataset
        .records()
        .iter()
        .filter(|r| !seen.insert(r.values.as_slice()))
        .count()
}
