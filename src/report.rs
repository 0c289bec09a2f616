//! Pipeline entry point and the report it produces.
//!
//! ```text
//!   Dataset ─▶ validate ─▶ filter ─┬▶ summarize ──┐
//!                                  ├▶ group_by ───┤
//!                                  ├▶ fit_linear ─┼▶ assemble ─▶ ReportSummary
//!                                  └▶ classify ───┘
//! ```

use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use serde::Serialize;

use crate::analysis::group::{group_by, GroupStats};
use crate::analysis::performance::{classify, Classification};
use crate::analysis::summary::{highlights, summarize, Highlights, SummaryStats};
use crate::analysis::trend::{fit_linear, indexed, series, Direction, SeriesPoint, TrendModel};
use crate::config::Config;
use crate::data::filter::{self, FilterOutcome};
use crate::data::model::Dataset;
use crate::data::validate::{validate, ValidationReport};
use crate::error::Result;

/// Statistics of one dataset view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSummary {
    pub records: usize,
    pub stats: SummaryStats,
    pub highlights: Option<Highlights>,
}

/// Filter that produced the filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSummary {
    /// Human-readable conjunction, e.g. `Sales > 1000 AND Region in {North}`.
    pub description: String,
    pub threshold: Option<f64>,
    pub kept: usize,
    pub unusable: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub model: TrendModel,
    pub direction: Direction,
    pub points: Vec<SeriesPoint>,
    pub fitted: Vec<f64>,
}

impl TrendSummary {
    pub fn new(model: TrendModel, points: Vec<SeriesPoint>) -> Self {
        TrendSummary {
            direction: model.direction(),
            fitted: model.predict().collect(),
            model,
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupingSummary {
    pub keys: Vec<String>,
    pub groups: Vec<GroupStats>,
}

impl GroupingSummary {
    /// First group in the configured order.
    pub fn leading(&self) -> Option<&GroupStats> {
        self.groups.first()
    }
}

/// Everything one run computed. Built only by [`assemble`]; handed by value
/// to presentation code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub generated_at: String,
    pub measure_column: String,
    pub validation: ValidationReport,
    pub filter: FilterSummary,
    pub original: ViewSummary,
    pub filtered: ViewSummary,
    /// Filtered total minus original total.
    pub total_delta: f64,
    pub grouping: Option<GroupingSummary>,
    pub trend: Option<TrendSummary>,
    pub performance: Option<Classification>,
}

/// Already-computed stage outputs, gathered for [`assemble`].
#[derive(Debug, Clone)]
pub struct StageOutputs {
    pub measure_column: String,
    pub validation: ValidationReport,
    pub filter: FilterSummary,
    pub original: ViewSummary,
    pub filtered: ViewSummary,
    pub grouping: Option<GroupingSummary>,
    pub trend: Option<TrendSummary>,
    pub performance: Option<Classification>,
}

/// Package stage outputs with a timestamp. No recomputation happens here.
pub fn assemble(outputs: StageOutputs, generated_at: NaiveDateTime, date_format: &str) -> ReportSummary {
    let StageOutputs {
        measure_column,
        validation,
        filter,
        original,
        filtered,
        grouping,
        trend,
        performance,
    } = outputs;
    ReportSummary {
        generated_at: generated_at.format(date_format).to_string(),
        measure_column,
        validation,
        filter,
        total_delta: filtered.stats.sum - original.stats.sum,
        original,
        filtered,
        grouping,
        trend,
        performance,
    }
}

/// A report together with the filtered rows its stages consumed.
#[derive(Debug, Clone)]
pub struct ReportRun {
    pub summary: ReportSummary,
    pub filtered: Dataset,
}

/// Highlights need the entity column; without it the view has none.
fn view_summary(dataset: &Dataset, config: &Config, with_entity: bool) -> Result<ViewSummary> {
    let highlights = if with_entity {
        highlights(dataset, &config.entity_column, &config.measure_column)?
    } else {
        None
    };
    Ok(ViewSummary {
        records: dataset.len(),
        stats: summarize(dataset, &config.measure_column)?,
        highlights,
    })
}

/// Run every stage over `dataset` and assemble the report, timestamped now.
pub fn run(dataset: &Dataset, config: &Config) -> Result<ReportSummary> {
    run_at(dataset, config, Local::now().naive_local())
}

/// [`run`] with an explicit timestamp.
pub fn run_at(dataset: &Dataset, config: &Config, now: NaiveDateTime) -> Result<ReportSummary> {
    execute_at(dataset, config, now).map(|run| run.summary)
}

/// Like [`run`], but also hands back the filtered rows for export.
pub fn execute(dataset: &Dataset, config: &Config) -> Result<ReportRun> {
    execute_at(dataset, config, Local::now().naive_local())
}

/// [`execute`] with an explicit timestamp.
pub fn execute_at(dataset: &Dataset, config: &Config, now: NaiveDateTime) -> Result<ReportRun> {
    config.validate()?;
    let thresholds = config.tier_thresholds()?;

    let validation = validate(dataset, &config.validation_rules())?;

    let spec = config.filter_spec();
    let FilterOutcome {
        dataset: filtered,
        unusable,
    } = filter::apply(dataset, &spec)?;
    info!("filter applied: {spec}");
    info!("records kept: {}/{}", filtered.len(), dataset.len());
    if unusable > 0 {
        warn!("{unusable} record(s) dropped for unusable filter cells");
    }

    let with_entity = dataset.schema().contains(&config.entity_column);
    if !with_entity {
        warn!(
            "entity column '{}' not found, highlights skipped",
            config.entity_column
        );
    }
    let original = view_summary(dataset, config, with_entity)?;
    let filtered_summary = view_summary(&filtered, config, with_entity)?;

    let grouping = if config.group_keys.is_empty() {
        None
    } else {
        let groups = group_by(
            &filtered,
            &config.group_keys,
            &config.measure_column,
            config.group_sort,
        )?;
        Some(GroupingSummary {
            keys: config.group_keys.clone(),
            groups,
        })
    };

    let trend = if filtered.is_empty() {
        info!("trend skipped: no record passed the filter");
        None
    } else {
        let points = series(&filtered, &config.measure_column, config.date_column.as_deref())?;
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let model = fit_linear(&indexed(&values))?;
        Some(TrendSummary::new(model, points))
    };

    let performance = match &config.target_column {
        Some(target) => Some(classify(
            &filtered,
            &config.measure_column,
            target,
            &thresholds,
        )?),
        None => None,
    };

    let summary = assemble(
        StageOutputs {
            measure_column: config.measure_column.clone(),
            validation,
            filter: FilterSummary {
                description: spec.to_string(),
                threshold: config.filter_threshold,
                kept: filtered.len(),
                unusable,
            },
            original,
            filtered: filtered_summary,
            grouping,
            trend,
            performance,
        },
        now,
        &config.date_format,
    );
    Ok(ReportRun { summary, filtered })
}
