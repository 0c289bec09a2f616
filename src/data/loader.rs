use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array,
};
use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, Value};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a sales dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one record per line
/// * `.json`    – `[{ "Customer": "Ana", "Sales": 1500, ... }, ...]`
/// * `.parquet` – flat table of scalar columns
pub fn load_file(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        bail!("input file not found: {}", path.display());
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "loaded {} record(s) with {} column(s) from {}",
        dataset.len(),
        dataset.schema().len(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Header row with column names; every cell type is guessed independently.
fn load_csv(path: &Path) -> Result<Dataset> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

pub(crate) fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Dataset> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: {} field(s) but the header has {}",
                record.len(),
                headers.len()
            );
        }
        rows.push(record.iter().map(Value::parse).collect());
    }

    Ok(Dataset::from_rows(&headers, rows)?)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "Customer": "Ana", "Sales": 1500, "Region": "North" },
///   ...
/// ]
/// ```
///
/// Columns are the union of all keys in first-seen order; absent keys
/// become missing cells.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

pub(crate) fn parse_json(text: &str) -> Result<Dataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows: Vec<Vec<Value>> = records
        .iter()
        .filter_map(JsonValue::as_object)
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_value).unwrap_or(Value::Missing))
                .collect()
        })
        .collect();

    Ok(Dataset::from_rows(&headers, rows)?)
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Missing),
        JsonValue::String(s) => match Value::parse(s) {
            // Numeric-looking strings stay text in JSON.
            Value::Number(_) => Value::Text(s.clone()),
            other => other,
        },
        JsonValue::Bool(b) => Value::Text(b.to_string()),
        JsonValue::Null => Value::Missing,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of scalar columns (strings, ints, floats, bools,
/// dates). Works with files written by both **Pandas** (`df.to_parquet()`)
/// and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;
    let rows = read_batches(reader)?;

    Ok(Dataset::from_rows(&headers, rows)?)
}

/// Flatten record batches into positional rows. Rows are numbered across
/// batches.
fn read_batches<I>(batches: I) -> Result<Vec<Vec<Value>>>
where
    I: IntoIterator<Item = std::result::Result<RecordBatch, ArrowError>>,
{
    let mut rows = Vec::new();
    for batch_result in batches {
        let batch = batch_result.context("reading parquet record batch")?;
        let offset = rows.len();
        for row in 0..batch.num_rows() {
            let values = batch
                .columns()
                .iter()
                .map(|col| extract_value(col, row))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Row {}", offset + row))?;
            rows.push(values);
        }
    }
    Ok(rows)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Missing);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::Text(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Value::Number(downcast::<Int32Array>(col)?.value(row) as f64),
        DataType::Int64 => Value::Number(downcast::<Int64Array>(col)?.value(row) as f64),
        DataType::Float32 => Value::Number(downcast::<Float32Array>(col)?.value(row) as f64),
        DataType::Float64 => Value::Number(downcast::<Float64Array>(col)?.value(row)),
        DataType::Boolean => Value::Text(downcast::<BooleanArray>(col)?.value(row).to_string()),
        DataType::Date32 => {
            let days = downcast::<Date32Array>(col)?.value(row);
            NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
                .map(Value::Date)
                .context("date out of range")?
        }
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(value)
}

/// Days from 0001-01-01 to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn downcast<T: 'static>(col: &ArrayRef) -> Result<&T> {
    col.as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("unexpected array for {:?}", col.data_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::ValueKind;

    #[test]
    fn csv_cells_are_typed() {
        let text = "Customer,Sales,Date\nAna,1500,2024-01-01\nBruno,,2024-01-08\n";
        let ds = read_csv(csv::Reader::from_reader(text.as_bytes())).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.schema().columns[1].kind, ValueKind::Number);
        assert_eq!(ds.schema().columns[2].kind, ValueKind::Date);
        assert_eq!(ds.records()[1].get(1), &Value::Missing);
    }

    #[test]
    fn csv_ragged_row_is_an_error() {
        let text = "Customer,Sales\nAna,1500,extra\n";
        assert!(read_csv(csv::Reader::from_reader(text.as_bytes())).is_err());
    }

    #[test]
    fn json_union_of_keys_in_first_seen_order() {
        let ds = parse_json(
            r#"[{"Customer": "Ana", "Sales": 1500},
                {"Sales": 800, "Customer": "Bruno", "Region": "South"}]"#,
        )
        .unwrap();
        let names: Vec<&str> = ds.schema().names().collect();
        assert_eq!(names, vec!["Customer", "Sales", "Region"]);
        assert_eq!(ds.records()[0].get(2), &Value::Missing);
        assert_eq!(ds.records()[1].number(1), Some(800.0));
    }

    #[test]
    fn json_rejects_non_array_root() {
        assert!(parse_json(r#"{"Customer": "Ana"}"#).is_err());
    }

    fn single_column_batch(col: ArrayRef) -> std::result::Result<RecordBatch, ArrowError> {
        RecordBatch::try_from_iter([("Sales", col)])
    }

    #[test]
    fn batch_errors_name_the_row_across_batches() {
        use std::sync::Arc;

        use arrow::array::UInt8Array;

        let batches = vec![
            single_column_batch(Arc::new(Float64Array::from(vec![1500.0, 800.0]))),
            single_column_batch(Arc::new(UInt8Array::from(vec![7u8]))),
        ];
        let err = read_batches(batches).unwrap_err();
        assert_eq!(err.to_string(), "Row 2");
        assert!(format!("{err:#}").contains("unsupported column type"));
    }

    #[test]
    fn batches_flatten_in_order() {
        use std::sync::Arc;

        let batches = vec![
            single_column_batch(Arc::new(Float64Array::from(vec![1.0, 2.0]))),
            single_column_batch(Arc::new(Float64Array::from(vec![Some(3.0), None]))),
        ];
        let rows = read_batches(batches).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Value::Number(1.0)],
                vec![Value::Number(2.0)],
                vec![Value::Number(3.0)],
                vec![Value::Missing],
            ]
        );
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.xlsx");
        std::fs::write(&path, b"").unwrap();
        let err = load_file(&path).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = load_file(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.csv"));
    }
}
