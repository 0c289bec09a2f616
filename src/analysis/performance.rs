use std::fmt;

use log::{debug, warn};
use serde::Serialize;

use super::summary::SummaryStats;
use crate::data::model::Dataset;
use crate::error::{AnalyticsError, Result};

/// Attainment tier, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Below,
    Near,
    Above,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Below => "below goal",
            Tier::Near => "near goal",
            Tier::Above => "above goal",
        };
        f.write_str(s)
    }
}

/// Ratio thresholds separating the tiers. Lower edges are inclusive:
/// `ratio >= above` is `Above`, `near <= ratio < above` is `Near`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierThresholds {
    pub near: f64,
    pub above: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        TierThresholds {
            near: 0.80,
            above: 1.00,
        }
    }
}

impl TierThresholds {
    /// Build from an ascending `[near, above]` list.
    pub fn from_list(list: &[f64]) -> Result<Self> {
        match *list {
            [near, above] if near.is_finite() && above.is_finite() && 0.0 < near && near < above => {
                Ok(TierThresholds { near, above })
            }
            _ => Err(AnalyticsError::configuration(format!(
                "performance_tiers must be two ascending positive numbers, got {list:?}"
            ))),
        }
    }

    pub fn tier(&self, ratio: f64) -> Tier {
        if ratio >= self.above {
            Tier::Above
        } else if ratio >= self.near {
            Tier::Near
        } else {
            Tier::Below
        }
    }
}

/// One classified row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceRecord {
    /// Source row of the record.
    pub row: usize,
    pub actual: f64,
    pub target: f64,
    pub ratio: f64,
    pub tier: Tier,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    pub below: usize,
    pub near: usize,
    pub above: usize,
}

/// Output of [`classify`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub records: Vec<PerformanceRecord>,
    /// Rows without a usable actual value or with a missing or zero target.
    pub rejected: usize,
    pub counts: TierCounts,
    /// Statistics of the ratios of the classified rows.
    pub ratio_stats: SummaryStats,
}

/// Compare `actual_column` with `target_column` row by row.
///
/// Rows that cannot produce a finite ratio are skipped and counted, never
/// failing the batch.
pub fn classify(
    dataset: &Dataset,
    actual_column: &str,
    target_column: &str,
    thresholds: &TierThresholds,
) -> Result<Classification> {
    let idx = dataset
        .schema()
        .require(&[actual_column, target_column])?;
    let (actual_idx, target_idx) = (idx[0], idx[1]);

    let mut records = Vec::with_capacity(dataset.len());
    let mut rejected = 0;
    let mut counts = TierCounts::default();
    for record in dataset.records() {
        let (actual, target) = match (record.number(actual_idx), record.number(target_idx)) {
            (Some(a), Some(t)) if t != 0.0 => (a, t),
            _ => {
                debug!("row {}: no usable actual/target pair", record.row);
                rejected += 1;
                continue;
            }
        };
        let ratio = actual / target;
        if !ratio.is_finite() {
            rejected += 1;
            continue;
        }
        let tier = thresholds.tier(ratio);
        match tier {
            Tier::Below => counts.below += 1,
            Tier::Near => counts.near += 1,
            Tier::Above => counts.above += 1,
        }
        records.push(PerformanceRecord {
            row: record.row,
            actual,
            target,
            ratio,
            tier,
        });
    }

    if rejected > 0 {
        warn!("{rejected} row(s) skipped in goal comparison: missing or zero {target_column}");
    }
    let ratio_stats = SummaryStats::from_values(records.iter().map(|r| r.ratio));
    Ok(Classification {
        records,
        rejected,
        counts,
        ratio_stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Value;

    fn goals(rows: &[(f64, Value)]) -> Dataset {
        Dataset::from_rows(
            &["Sales", "Goal"],
            rows.iter()
                .map(|(a, t)| vec![Value::from(*a), t.clone()])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn tiers_have_inclusive_lower_edges() {
        let t = TierThresholds::default();
        assert_eq!(t.tier(0.79), Tier::Below);
        assert_eq!(t.tier(0.80), Tier::Near);
        assert_eq!(t.tier(0.999), Tier::Near);
        assert_eq!(t.tier(1.0), Tier::Above);
        assert_eq!(t.tier(1.7), Tier::Above);
    }

    #[test]
    fn classifies_each_row() {
        let ds = goals(&[(900.0, 1000.0.into()), (1000.0, 1000.0.into()), (500.0, 1000.0.into())]);
        let out = classify(&ds, "Sales", "Goal", &TierThresholds::default()).unwrap();
        let tiers: Vec<Tier> = out.records.iter().map(|r| r.tier).collect();
        assert_eq!(tiers, vec![Tier::Near, Tier::Above, Tier::Below]);
        assert_eq!(out.records[0].ratio, 0.9);
        assert_eq!(out.counts, TierCounts { below: 1, near: 1, above: 1 });
        assert_eq!(out.rejected, 0);
        assert_eq!(out.ratio_stats.count, 3);
    }

    #[test]
    fn zero_or_missing_targets_are_rejected_per_row() {
        let ds = goals(&[
            (900.0, 0.0.into()),
            (900.0, Value::Missing),
            (900.0, "tbd".into()),
            (1200.0, 1000.0.into()),
        ]);
        let out = classify(&ds, "Sales", "Goal", &TierThresholds::default()).unwrap();
        assert_eq!(out.rejected, 3);
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].row, 3);
        assert_eq!(out.records[0].tier, Tier::Above);
    }

    #[test]
    fn custom_thresholds_apply() {
        let t = TierThresholds::from_list(&[0.5, 0.9]).unwrap();
        assert_eq!(t.tier(0.6), Tier::Near);
        assert_eq!(t.tier(0.9), Tier::Above);
    }

    #[test]
    fn malformed_thresholds_are_configuration_errors() {
        for bad in [&[1.0, 0.8][..], &[0.8][..], &[0.0, 1.0][..], &[0.8, f64::NAN][..]] {
            let err = TierThresholds::from_list(bad).unwrap_err();
            assert!(matches!(err, AnalyticsError::Configuration(_)), "{bad:?}");
        }
    }

    #[test]
    fn missing_target_column_is_a_schema_error() {
        let ds = Dataset::from_rows(&["Sales"], vec![vec![1.0.into()]]).unwrap();
        let err = classify(&ds, "Sales", "Goal", &TierThresholds::default()).unwrap_err();
        assert_eq!(err, AnalyticsError::schema(["Goal"]));
    }
}
