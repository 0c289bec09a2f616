use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use anyhow::{Context, Result};

use crate::data::model::Dataset;
use crate::report::ReportSummary;

const RULE_WIDTH: usize = 60;

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// `1234567.891` → `1,234,567.89`
pub fn format_amount(value: f64) -> String {
    let negative = value < 0.0;
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{grouped}.{frac_part}", if negative { "-" } else { "" })
}

/// Executive summary block for the terminal.
pub fn render_console(report: &ReportSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = render_into(&mut out, report, &rule);
    out
}

fn render_into(out: &mut String, report: &ReportSummary, rule: &str) -> std::fmt::Result {
    writeln!(out, "{rule}")?;
    writeln!(out, "SALES REPORT - EXECUTIVE SUMMARY")?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Generated at: {}", report.generated_at)?;
    writeln!(out, "Records processed: {}", report.original.records)?;
    writeln!(out, "Records qualified: {}", report.filtered.records)?;
    writeln!(out, "Filter: {}", report.filter.description)?;
    if report.validation.duplicate_rows > 0 {
        writeln!(out, "Duplicate rows: {}", report.validation.duplicate_rows)?;
    }

    writeln!(out)?;
    writeln!(out, "TOTAL SALES:")?;
    writeln!(out, "   Total: {}", format_amount(report.original.stats.sum))?;
    writeln!(out, "   Mean:  {}", format_amount(report.original.stats.mean))?;

    if report.filtered.records > 0 {
        writeln!(out)?;
        writeln!(out, "QUALIFIED SALES:")?;
        writeln!(out, "   Total: {}", format_amount(report.filtered.stats.sum))?;
        writeln!(out, "   Mean:  {}", format_amount(report.filtered.stats.mean))?;
        writeln!(out, "   Largest sale: {}", format_amount(report.filtered.stats.max))?;
        if let Some(h) = &report.filtered.highlights {
            writeln!(
                out,
                "   Top customer: {} ({:.1}% of total, {} above mean)",
                h.top_entity, h.top_share_pct, h.above_mean
            )?;
        }
    } else {
        writeln!(out)?;
        match report.filter.threshold {
            Some(t) => writeln!(out, "No sale meets the minimum of {}", format_amount(t))?,
            None => writeln!(out, "No sale passes the filter")?,
        }
    }

    if let Some(grouping) = &report.grouping {
        writeln!(out)?;
        writeln!(out, "BY {}:", grouping.keys.join(" / ").to_uppercase())?;
        for g in &grouping.groups {
            writeln!(
                out,
                "   {:<20} {:>16}  ({} rows, mean {})",
                g.label,
                format_amount(g.stats.sum),
                g.rows,
                format_amount(g.stats.mean)
            )?;
        }
    }

    if let Some(trend) = &report.trend {
        writeln!(out)?;
        writeln!(
            out,
            "TREND: {:?} ({} per step over {} point(s))",
            trend.direction,
            format_amount(trend.model.slope),
            trend.points.len()
        )?;
    }

    if let Some(perf) = &report.performance {
        writeln!(out)?;
        writeln!(out, "GOAL PERFORMANCE:")?;
        writeln!(out, "   Above goal: {}", perf.counts.above)?;
        writeln!(out, "   Near goal:  {}", perf.counts.near)?;
        writeln!(out, "   Below goal: {}", perf.counts.below)?;
        if perf.rejected > 0 {
            writeln!(out, "   Without usable goal: {}", perf.rejected)?;
        }
    }

    writeln!(out, "{rule}")
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Write the rows of `dataset` as CSV with a header row.
pub fn write_filtered_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record(dataset.schema().names())
        .context("writing CSV header")?;
    for record in dataset.records() {
        writer
            .write_record(record.values.iter().map(|v| v.to_string()))
            .with_context(|| format!("writing row {}", record.row))?;
    }
    writer.flush().context("flushing CSV")?;
    log::info!("filtered rows written to {}", path.display());
    Ok(())
}

/// Write the report as pretty JSON.
pub fn write_summary_json(report: &ReportSummary, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).context("serializing report")?;
    writer.flush().context("flushing report")?;
    log::info!("report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::report;
    use chrono::NaiveDate;

    fn sample() -> Dataset {
        Dataset::from_rows(
            &["Customer", "Sales"],
            vec![
                vec!["Ana".into(), 1500.0.into()],
                vec!["Bruno".into(), 800.0.into()],
                vec!["Carla".into(), 2000.0.into()],
            ],
        )
        .unwrap()
    }

    fn report_for(config: &Config) -> ReportSummary {
        let now = NaiveDate::from_ymd_opt(2025, 1, 7)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        report::run_at(&sample(), config, now).unwrap()
    }

    #[test]
    fn amounts_use_thousands_separators() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-3500.0), "-3,500.00");
    }

    #[test]
    fn console_summary_lists_qualified_sales() {
        let text = render_console(&report_for(&Config::default()));
        assert!(text.contains("Records processed: 3"));
        assert!(text.contains("Records qualified: 2"));
        assert!(text.contains("Total: 3,500.00"));
        assert!(text.contains("Top customer: Carla"));
    }

    #[test]
    fn console_summary_explains_empty_result() {
        let config = Config {
            filter_threshold: Some(5000.0),
            ..Config::default()
        };
        let text = render_console(&report_for(&config));
        assert!(text.contains("No sale meets the minimum of 5,000.00"));
    }

    #[test]
    fn csv_export_round_trips_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let filtered = report::execute(&sample(), &Config::default())
            .unwrap()
            .filtered;
        write_filtered_csv(&filtered, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Customer,Sales\nAna,1500\nCarla,2000\n");
    }

    #[test]
    fn json_export_is_parseable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_summary_json(&report_for(&Config::default()), &path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["filtered"]["stats"]["sum"], 3500.0);
        assert_eq!(json["generated_at"], "2025-01-07 09:30:00");
        assert_eq!(json["original"]["highlights"]["top_entity"], "Carla");
        assert!(json["grouping"].is_null());
    }
}
