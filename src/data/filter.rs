use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::{Dataset, Record, Value};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
}

impl Comparison {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            Comparison::Gt => ord == Ordering::Greater,
            Comparison::Ge => ord != Ordering::Less,
            Comparison::Lt => ord == Ordering::Less,
            Comparison::Le => ord != Ordering::Greater,
            Comparison::Eq => ord == Ordering::Equal,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Eq => "==",
        }
    }
}

/// A single column test.
///
/// In JSON:
/// ```json
/// { "column": "Sales", "op": ">=", "value": 1000 }
/// { "column": "Region", "in": ["North", "South"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
    Compare {
        column: String,
        op: Comparison,
        value: Value,
    },
    InSet {
        column: String,
        #[serde(rename = "in")]
        values: BTreeSet<Value>,
    },
}

impl Predicate {
    pub fn compare(column: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn in_set<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Predicate::InSet {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Predicate::Compare { column, .. } | Predicate::InSet { column, .. } => column,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { column, op, value } => {
                write!(f, "{column} {} {value}", op.symbol())
            }
            Predicate::InSet { column, values } => {
                let list: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{column} in {{{}}}", list.join(", "))
            }
        }
    }
}

/// Ordered conjunction of predicates. Empty passes everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSpec {
    pub predicates: Vec<Predicate>,
}

impl FilterSpec {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        FilterSpec { predicates }
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            return write!(f, "<none>");
        }
        let parts: Vec<String> = self.predicates.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join(" AND "))
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Result of [`apply`]: the surviving view plus the number of records
/// dropped because a comparison met a cell of the wrong type.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub dataset: Dataset,
    pub unusable: usize,
}

enum Verdict {
    Pass,
    Fail,
    Unusable,
}

/// A predicate bound to its column position.
struct Bound<'a> {
    index: usize,
    predicate: &'a Predicate,
}

impl Bound<'_> {
    fn test(&self, record: &Record) -> Verdict {
        let cell = record.get(self.index);
        match self.predicate {
            Predicate::InSet { values, .. } => {
                if values.contains(cell) {
                    Verdict::Pass
                } else {
                    Verdict::Fail
                }
            }
            Predicate::Compare { op, value, .. } => match compare_cells(cell, value) {
                Some(ord) if op.accepts(ord) => Verdict::Pass,
                Some(_) => Verdict::Fail,
                None => Verdict::Unusable,
            },
        }
    }
}

/// Ordering between a cell and a comparison value of the same kind.
/// Cells of another kind, missing cells and NaN are incomparable.
fn compare_cells(cell: &Value, target: &Value) -> Option<Ordering> {
    match (cell, target) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Keep the records that satisfy every predicate, preserving order.
///
/// A record passes a predicate when:
/// * comparison: the cell has the value's kind and the ordering matches
/// * membership: the cell equals one of the allowed values
///
/// Records whose cell cannot be compared are excluded and counted in
/// [`FilterOutcome::unusable`]. A predicate naming an unknown column is a
/// schema error.
pub fn apply(dataset: &Dataset, spec: &FilterSpec) -> Result<FilterOutcome> {
    let columns: Vec<&str> = spec.predicates.iter().map(Predicate::column).collect();
    let indices = dataset.schema().require(&columns)?;
    let bound: Vec<Bound<'_>> = indices
        .into_iter()
        .zip(&spec.predicates)
        .map(|(index, predicate)| Bound { index, predicate })
        .collect();

    let mut unusable = 0;
    let filtered = dataset.select(|record| {
        for b in &bound {
            match b.test(record) {
                Verdict::Pass => {}
                Verdict::Fail => return false,
                Verdict::Unusable => {
                    unusable += 1;
                    return false;
                }
            }
        }
        true
    });

    Ok(FilterOutcome {
        dataset: filtered,
        unusable,
    })
}
