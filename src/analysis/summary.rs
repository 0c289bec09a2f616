use serde::Serialize;

use crate::data::model::{Dataset, Record};
use crate::error::Result;

// ---------------------------------------------------------------------------
// SummaryStats
// ---------------------------------------------------------------------------

/// Scalar statistics over one numeric column.
///
/// A zero `count` is the legitimate "no data" state: every numeric field is
/// then `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Cells that were missing or not numeric.
    pub skipped: usize,
}

impl SummaryStats {
    /// Fold a sequence of numbers.
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut stats = SummaryStats::default();
        for v in values {
            stats.push(v);
        }
        stats.finish()
    }

    pub(crate) fn push(&mut self, v: f64) {
        if self.count == 0 {
            self.min = v;
            self.max = v;
        } else {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self.count += 1;
        self.sum += v;
    }

    pub(crate) fn finish(mut self) -> Self {
        self.mean = if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        };
        self
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Accumulate the usable numbers of column `idx` over `records`.
pub(crate) fn summarize_records<'a, I>(records: I, idx: usize) -> SummaryStats
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut stats = SummaryStats::default();
    for record in records {
        match record.number(idx) {
            Some(v) => stats.push(v),
            None => stats.skipped += 1,
        }
    }
    stats.finish()
}

/// Count, sum, mean, min and max of a numeric column. Missing and
/// non-numeric cells are skipped and counted.
pub fn summarize(dataset: &Dataset, column: &str) -> Result<SummaryStats> {
    let idx = dataset.column_index(column)?;
    Ok(summarize_records(dataset.records(), idx))
}

// ---------------------------------------------------------------------------
// Highlights
// ---------------------------------------------------------------------------

/// Headline figures around the best-selling entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlights {
    /// Entity of the row with the largest measure (first one on ties).
    pub top_entity: String,
    pub top_value: f64,
    /// Share of the column total held by the top row, in percent.
    pub top_share_pct: f64,
    /// Rows strictly above the mean.
    pub above_mean: usize,
}

/// `None` when the column holds no usable number.
pub fn highlights(
    dataset: &Dataset,
    entity_column: &str,
    measure_column: &str,
) -> Result<Option<Highlights>> {
    let entity_idx = dataset.column_index(entity_column)?;
    let measure_idx = dataset.column_index(measure_column)?;
    let stats = summarize_records(dataset.records(), measure_idx);

    let mut top: Option<(&Record, f64)> = None;
    for record in dataset.records() {
        if let Some(v) = record.number(measure_idx) {
            if top.map_or(true, |(_, best)| v > best) {
                top = Some((record, v));
            }
        }
    }

    Ok(top.map(|(record, top_value)| Highlights {
        top_entity: record.get(entity_idx).to_string(),
        top_value,
        top_share_pct: if stats.sum == 0.0 {
            0.0
        } else {
            top_value / stats.sum * 100.0
        },
        above_mean: dataset
            .records()
            .iter()
            .filter_map(|r| r.number(measure_idx))
            .filter(|v| *v > stats.mean)
            .count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Value;
    use crate::error::AnalyticsError;

    fn sales(rows: &[(&str, Value)]) -> Dataset {
        Dataset::from_rows(
            &["Customer", "Sales"],
            rows.iter()
                .map(|(c, v)| vec![Value::from(*c), v.clone()])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn summarizes_numeric_column() {
        let ds = sales(&[("Ana", 1500.0.into()), ("Carla", 2000.0.into())]);
        let stats = summarize(&ds, "Sales").unwrap();
        assert_eq!(
            stats,
            SummaryStats { count: 2, sum: 3500.0, mean: 1750.0, min: 1500.0, max: 2000.0, skipped: 0 }
        );
    }

    #[test]
    fn empty_dataset_is_all_zero() {
        let ds = sales(&[]);
        let stats = summarize(&ds, "Sales").unwrap();
        assert_eq!(stats, SummaryStats::default());
        assert!(stats.is_empty());
    }

    #[test]
    fn unusable_cells_are_skipped() {
        let ds = sales(&[
            ("Ana", 10.0.into()),
            ("Bruno", Value::Missing),
            ("Carla", "oops".into()),
            ("Davi", (-2.0).into()),
        ]);
        let stats = summarize(&ds, "Sales").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.min, -2.0);
        assert_eq!(stats.mean, 4.0);
    }

    #[test]
    fn unknown_column_is_a_schema_error() {
        let err = summarize(&sales(&[]), "Revenue").unwrap_err();
        assert_eq!(err, AnalyticsError::schema(["Revenue"]));
    }

    #[test]
    fn highlights_pick_first_top_row() {
        let ds = sales(&[
            ("Ana", 1000.0.into()),
            ("Bruno", 3000.0.into()),
            ("Carla", 3000.0.into()),
            ("Davi", 2000.0.into()),
        ]);
        let h = highlights(&ds, "Customer", "Sales").unwrap().unwrap();
        assert_eq!(h.top_entity, "Bruno");
        assert_eq!(h.top_value, 3000.0);
        assert!((h.top_share_pct - 33.333).abs() < 1e-3);
        assert_eq!(h.above_mean, 2);
    }

    #[test]
    fn highlights_none_without_numbers() {
        let ds = sales(&[("Ana", Value::Missing)]);
        assert_eq!(highlights(&ds, "Customer", "Sales").unwrap(), None);
    }
}
