use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::summary::{summarize_records, SummaryStats};
use crate::data::model::{Dataset, Record, Value};
use crate::error::Result;

/// Tuple of key-column values identifying one partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<Value>);

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|v| match v {
                Value::Missing => "<missing>".to_string(),
                other => other.to_string(),
            })
            .collect();
        write!(f, "{}", parts.join(" / "))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: GroupKey,
    pub label: String,
    /// Every record of the group, including those without a usable measure.
    pub rows: usize,
    pub stats: SummaryStats,
}

/// Order of the grouped output. Sorting is stable, so ties keep
/// first-seen order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSort {
    FirstSeen,
    #[default]
    TotalDesc,
    TotalAsc,
    MeanDesc,
    CountDesc,
}

/// Partition `dataset` by the values of `key_columns` and summarize
/// `measure_column` within each partition.
///
/// Every record lands in exactly one group; missing key cells form their own
/// key value.
pub fn group_by<S: AsRef<str>>(
    dataset: &Dataset,
    key_columns: &[S],
    measure_column: &str,
    sort: GroupSort,
) -> Result<Vec<GroupStats>> {
    let key_idx = dataset.schema().require(key_columns)?;
    let measure_idx = dataset.column_index(measure_column)?;

    let mut order: Vec<(GroupKey, Vec<&Record>)> = Vec::new();
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();
    for record in dataset.records() {
        let key = GroupKey(key_idx.iter().map(|&i| record.get(i).clone()).collect());
        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            order.push((key, Vec::new()));
            order.len() - 1
        });
        order[slot].1.push(record);
    }

    let mut groups: Vec<GroupStats> = order
        .into_iter()
        .map(|(key, members)| GroupStats {
            label: key.to_string(),
            rows: members.len(),
            stats: summarize_records(members, measure_idx),
            key,
        })
        .collect();

    match sort {
        GroupSort::FirstSeen => {}
        GroupSort::TotalDesc => groups.sort_by(|a, b| b.stats.sum.total_cmp(&a.stats.sum)),
        GroupSort::TotalAsc => groups.sort_by(|a, b| a.stats.sum.total_cmp(&b.stats.sum)),
        GroupSort::MeanDesc => groups.sort_by(|a, b| b.stats.mean.total_cmp(&a.stats.mean)),
        GroupSort::CountDesc => groups.sort_by(|a, b| b.rows.cmp(&a.rows)),
    }

    log::debug!("grouped {} record(s) into {} group(s)", dataset.len(), groups.len());
    Ok(groups)
}
