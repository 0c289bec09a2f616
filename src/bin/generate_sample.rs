use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use clap::Parser;
use parquet::arrow::ArrowWriter;

const CUSTOMERS: [(&str, f64); 10] = [
    ("Ana", 1500.0),
    ("Bruno", 800.0),
    ("Carla", 2000.0),
    ("Daniel", 1200.0),
    ("Eduardo", 2200.0),
    ("Fernanda", 890.0),
    ("Gabriel", 1650.0),
    ("Helena", 3100.0),
    ("Igor", 750.0),
    ("Julia", 1980.0),
];
const REGIONS: [&str; 4] = ["North", "South", "East", "West"];
const CATEGORIES: [&str; 3] = ["Premium", "Standard", "Basic"];

/// Write a deterministic sample sales dataset.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Output file; `.csv` or `.parquet`
    #[arg(default_value = "sales.csv")]
    output: PathBuf,

    /// Random seed
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    fn choose<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

struct Row {
    customer: &'static str,
    sales: f64,
    region: &'static str,
    category: &'static str,
    date: NaiveDate,
    goal: f64,
}

/// Weekly sales from 2024-01-01 with a goal within ±20% of the sale.
fn generate(seed: u64) -> Result<Vec<Row>> {
    let mut rng = SimpleRng::new(seed);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;
    Ok(CUSTOMERS
        .iter()
        .enumerate()
        .map(|(i, &(customer, sales))| Row {
            customer,
            sales,
            region: rng.choose(&REGIONS),
            category: rng.choose(&CATEGORIES),
            date: start + Duration::weeks(i as i64),
            goal: (sales * rng.uniform(0.8, 1.2)).round(),
        })
        .collect())
}

fn write_csv(rows: &[Row], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    writer.write_record(["Customer", "Sales", "Region", "Category", "Date", "Goal"])?;
    for row in rows {
        writer.write_record([
            row.customer.to_string(),
            row.sales.to_string(),
            row.region.to_string(),
            row.category.to_string(),
            row.date.format("%Y-%m-%d").to_string(),
            row.goal.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &Path) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("invalid epoch")?;
    let schema = Arc::new(Schema::new(vec![
        Field::new("Customer", DataType::Utf8, false),
        Field::new("Sales", DataType::Float64, false),
        Field::new("Region", DataType::Utf8, false),
        Field::new("Category", DataType::Utf8, false),
        Field::new("Date", DataType::Date32, false),
        Field::new("Goal", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.customer))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.sales))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.region))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.category))),
            Arc::new(Date32Array::from_iter_values(
                rows.iter().map(|r| (r.date - epoch).num_days() as i32),
            )),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.goal))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let rows = generate(args.seed)?;

    let ext = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(&rows, &args.output)?,
        "parquet" | "pq" => write_parquet(&rows, &args.output)?,
        other => bail!("Unsupported file extension: .{other}"),
    }

    println!("Wrote {} sales rows to {}", rows.len(), args.output.display());
    Ok(())
}
