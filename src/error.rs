use thiserror::Error;

/// Failures surfaced by the analytics pipeline.
///
/// Soft anomalies (duplicate rows, unusable cells, rows with no usable goal)
/// are never reported through this type; they travel as counts inside the
/// stage outputs instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("missing data: {0}")]
    MissingData(String),

    #[error("schema error: missing required column(s): {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("schema error: row {row} has {got} value(s) but the schema has {expected} column(s)")]
    SchemaMismatch {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("value range error: column '{column}' has {count} negative value(s), e.g. {}", format_sample(sample))]
    ValueRange {
        column: String,
        count: usize,
        sample: Vec<f64>,
    },

    #[error("insufficient data for {operation}: needed at least {needed} point(s), got {got}")]
    InsufficientData {
        operation: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AnalyticsError {
    pub fn schema<I, S>(missing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AnalyticsError::Schema {
            missing: missing.into_iter().map(Into::into).collect(),
        }
    }

    /// Both schema variants: absent columns and rows of the wrong width.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            AnalyticsError::Schema { .. } | AnalyticsError::SchemaMismatch { .. }
        )
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        AnalyticsError::Configuration(message.into())
    }
}

fn format_sample(sample: &[f64]) -> String {
    sample
        .iter()
        .map(|v| format!("{v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
