use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

// ---------------------------------------------------------------------------
// Value – a single cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
///
/// Serialized untagged, so JSON reads naturally: `1500.0`, `"2024-01-07"`,
/// `"Ana"`, `null`. Variant order matters for deserialization: a string that
/// parses as an ISO date becomes a `Date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Missing,
}

/// The declared type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Number,
    Date,
}

// -- Manual Eq/Ord/Hash so Value can key BTreeSet and HashMap --

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Missing => 0,
                Number(_) => 1,
                Date(_) => 2,
                Text(_) => 3,
            }
        }
        match (self, other) {
            (Missing, Missing) => Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Number(v) => v.to_bits().hash(state),
            Value::Date(d) => d.hash(state),
            Value::Text(s) => s.hash(state),
            Value::Missing => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => write!(f, "{s}"),
            Value::Missing => Ok(()),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl Value {
    /// The numeric payload, or `None` for text, dates and missing cells.
    /// NaN counts as unusable.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Number(_) => Some(ValueKind::Number),
            Value::Date(_) => Some(ValueKind::Date),
            Value::Text(_) => Some(ValueKind::Text),
            Value::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Guess the type of a raw text cell: empty → `Missing`, then number,
    /// then ISO date, falling back to text.
    pub fn parse(raw: &str) -> Value {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Missing;
        }
        // "nan" and "inf" parse as f64 but are names, not amounts.
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => return Value::Number(v),
            _ => {}
        }
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Value::Date(d);
        }
        Value::Text(raw.to_string())
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub kind: ValueKind,
}

/// Ordered column list shared by every record of a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Schema { columns }
    }

    /// Infer column kinds from the cells: a column is `Number` when every
    /// non-missing cell is numeric, `Date` when every one is a date, and
    /// `Text` otherwise (including all-missing columns).
    pub fn infer<S: AsRef<str>>(names: &[S], rows: &[Vec<Value>]) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut kinds: BTreeSet<u8> = BTreeSet::new();
                for row in rows {
                    match row.get(i).and_then(Value::kind) {
                        Some(ValueKind::Number) => kinds.insert(0),
                        Some(ValueKind::Date) => kinds.insert(1),
                        Some(ValueKind::Text) => kinds.insert(2),
                        None => false,
                    };
                }
                let kinds: Vec<u8> = kinds.into_iter().collect();
                let kind = match kinds.as_slice() {
                    [0] => ValueKind::Number,
                    [1] => ValueKind::Date,
                    _ => ValueKind::Text,
                };
                Column {
                    name: name.as_ref().to_string(),
                    kind,
                }
            })
            .collect();
        Schema { columns }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Resolve every name, reporting all unknown ones at once.
    pub fn require<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.index_of(name.as_ref()) {
                Some(i) => indices.push(i),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(AnalyticsError::Schema { missing })
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row
// ---------------------------------------------------------------------------

/// One row. `row` is the zero-based position in the source and stays fixed
/// through filtering, so it identifies the record across derived views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub row: usize,
    pub values: Vec<Value>,
}

impl Record {
    pub fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Missing)
    }

    pub fn number(&self, index: usize) -> Option<f64> {
        self.get(index).as_f64()
    }
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// An ordered, immutable collection of records sharing one schema.
/// Derived views share the schema and copy the surviving records.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    schema: Arc<Schema>,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset from positional rows. Every row must match the
    /// schema width.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Result<Self> {
        let width = schema.len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(AnalyticsError::SchemaMismatch {
                row: i,
                expected: width,
                got: row.len(),
            });
        }
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(row, values)| Record { row, values })
            .collect();
        Ok(Dataset {
            schema: Arc::new(schema),
            records,
        })
    }

    /// Convenience constructor inferring column kinds from the rows.
    pub fn from_rows<S: AsRef<str>>(names: &[S], rows: Vec<Vec<Value>>) -> Result<Self> {
        let schema = Schema::infer(names, &rows);
        Dataset::new(schema, rows)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.schema
            .index_of(name)
            .ok_or_else(|| AnalyticsError::schema([name]))
    }

    /// A new view holding the records accepted by `keep`, in order.
    pub fn select<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Record) -> bool,
    {
        Dataset {
            schema: Arc::clone(&self.schema),
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Usable numbers of a column, paired with the number of skipped cells.
    pub fn numbers(&self, column: &str) -> Result<(Vec<f64>, usize)> {
        let idx = self.column_index(column)?;
        let mut values = Vec::with_capacity(self.records.len());
        let mut skipped = 0;
        for record in &self.records {
            match record.number(idx) {
                Some(v) => values.push(v),
                None => skipped += 1,
            }
        }
        Ok((values, skipped))
    }

    /// Sorted set of distinct values in a column.
    pub fn unique_values(&self, column: &str) -> Result<BTreeSet<Value>> {
        let idx = self.column_index(column)?;
        Ok(self.records.iter().map(|r| r.get(idx).clone()).collect())
    }
}
