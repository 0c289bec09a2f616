use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::{error, info};

use sales_report::data::loader;
use sales_report::{output, report, Config};

#[derive(Parser, Debug)]
#[command(name = "sales-report", version, about = "Validate, filter and summarize sales data")]
struct Cli {
    /// Configuration file, created with defaults when absent
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Dataset to read, overriding `input_file`
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Filtered CSV to write, overriding `output_file`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON report to write, overriding `stats_file`
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Minimum sale, overriding `filter_threshold`
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Print the summary without writing any file
    #[arg(long)]
    no_export: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("report generation failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_create(&cli.config)?;
    if let Some(input) = cli.input {
        config.input_file = input;
    }
    if let Some(output) = cli.output {
        config.output_file = output;
    }
    if let Some(stats) = cli.stats {
        config.stats_file = stats;
    }
    if let Some(threshold) = cli.threshold {
        config.filter_threshold = Some(threshold);
    }

    info!("starting sales report");
    let dataset = loader::load_file(&config.input_file)?;
    let report::ReportRun { summary, filtered } = report::execute(&dataset, &config)?;

    if !cli.no_export {
        output::write_filtered_csv(&filtered, &config.output_file)?;
        output::write_summary_json(&summary, &config.stats_file)?;
    }

    print!("{}", output::render_console(&summary));
    info!("report generated");
    Ok(())
}
