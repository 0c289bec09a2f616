//! Property-based checks of the filter, grouping and summary stages.

use proptest::prelude::*;
use sales_report::analysis::group::{group_by, GroupSort};
use sales_report::analysis::summary::{summarize, SummaryStats};
use sales_report::data::filter::{apply, Comparison, FilterSpec, Predicate};
use sales_report::{Dataset, Value};

const REGIONS: [&str; 4] = ["North", "South", "East", "West"];

/// A measure cell: mostly numbers, sometimes missing or junk.
fn cell() -> impl Strategy<Value = Value> {
    prop_oneof![
        8 => (0.0..5000.0f64).prop_map(Value::Number),
        1 => Just(Value::Missing),
        1 => Just(Value::Text("n/a".into())),
    ]
}

fn dataset() -> impl Strategy<Value = Dataset> {
    prop::collection::vec((0..REGIONS.len(), cell()), 0..40).prop_map(|rows| {
        Dataset::from_rows(
            &["Region", "Sales"],
            rows.into_iter()
                .map(|(r, v)| vec![Value::from(REGIONS[r]), v])
                .collect(),
        )
        .unwrap()
    })
}

fn spec() -> impl Strategy<Value = FilterSpec> {
    let op = prop_oneof![
        Just(Comparison::Gt),
        Just(Comparison::Ge),
        Just(Comparison::Lt),
        Just(Comparison::Le),
        Just(Comparison::Eq),
    ];
    let compare = (op, 0.0..5000.0f64).prop_map(|(op, t)| Predicate::compare("Sales", op, t));
    let member = prop::sample::subsequence(REGIONS.to_vec(), 0..=REGIONS.len())
        .prop_map(|set| Predicate::in_set("Region", set));
    prop::collection::vec(prop_oneof![compare, member], 0..4).prop_map(FilterSpec::new)
}

proptest! {
    /// Filtering keeps an order-preserving subsequence of the input rows.
    #[test]
    fn filter_is_ordered_subset(ds in dataset(), spec in spec()) {
        let out = apply(&ds, &spec).unwrap().dataset;
        let rows: Vec<usize> = out.records().iter().map(|r| r.row).collect();
        prop_assert!(rows.windows(2).all(|w| w[0] < w[1]));
        for record in out.records() {
            prop_assert_eq!(record, &ds.records()[record.row]);
        }
    }

    #[test]
    fn filter_is_idempotent(ds in dataset(), spec in spec()) {
        let once = apply(&ds, &spec).unwrap().dataset;
        let twice = apply(&once, &spec).unwrap().dataset;
        prop_assert_eq!(once, twice);
    }

    /// Groups are disjoint and together cover every record.
    #[test]
    fn groups_partition_rows(ds in dataset()) {
        let groups = group_by(&ds, &["Region"], "Sales", GroupSort::TotalDesc).unwrap();
        let rows: usize = groups.iter().map(|g| g.rows).sum();
        prop_assert_eq!(rows, ds.len());
        let mut labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        labels.sort_unstable();
        labels.dedup();
        prop_assert_eq!(labels.len(), groups.len());
        prop_assert!(groups.windows(2).all(|w| w[0].stats.sum >= w[1].stats.sum));
    }

    #[test]
    fn summary_counts_every_cell(ds in dataset()) {
        let stats = summarize(&ds, "Sales").unwrap();
        prop_assert_eq!(stats.count + stats.skipped, ds.len());
        if stats.count == 0 {
            prop_assert_eq!(stats, SummaryStats { skipped: stats.skipped, ..SummaryStats::default() });
        } else {
            prop_assert!(stats.min <= stats.mean + 1e-9 && stats.mean <= stats.max + 1e-9);
        }
    }
}

#[test]
fn empty_view_summary_is_zero() {
    let ds = Dataset::from_rows(&["Region", "Sales"], Vec::new()).unwrap();
    assert_eq!(summarize(&ds, "Sales").unwrap(), SummaryStats::default());
}
