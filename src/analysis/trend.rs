use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::model::{Dataset, Value};
use crate::error::{AnalyticsError, Result};

/// Slopes smaller than this in magnitude count as flat.
const FLAT_EPSILON: f64 = 1e-9;

/// Least-squares line `value = slope * index + intercept` over an ordered
/// index domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendModel {
    pub slope: f64,
    pub intercept: f64,
    #[serde(skip)]
    domain: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rising,
    Falling,
    Flat,
}

impl TrendModel {
    pub fn value_at(&self, index: f64) -> f64 {
        self.slope * index + self.intercept
    }

    /// Fitted values over the fitted domain, one per input point. Each call
    /// starts a fresh pass.
    pub fn predict(&self) -> Predictions<'_> {
        Predictions {
            model: self,
            indices: self.domain.iter(),
        }
    }

    /// Extrapolate `steps` indices past the end of the domain, continuing its
    /// last spacing (1.0 for single-point domains).
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let last = self.domain.last().copied().unwrap_or(0.0);
        let step = match self.domain.as_slice() {
            [.., a, b] if b > a => b - a,
            _ => 1.0,
        };
        (1..=steps)
            .map(|k| self.value_at(last + step * k as f64))
            .collect()
    }

    pub fn direction(&self) -> Direction {
        if self.slope > FLAT_EPSILON {
            Direction::Rising
        } else if self.slope < -FLAT_EPSILON {
            Direction::Falling
        } else {
            Direction::Flat
        }
    }

    pub fn domain(&self) -> &[f64] {
        &self.domain
    }
}

/// Lazy iterator over fitted values. Cloning restarts from the same
/// position.
#[derive(Debug, Clone)]
pub struct Predictions<'a> {
    model: &'a TrendModel,
    indices: std::slice::Iter<'a, f64>,
}

impl Iterator for Predictions<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        self.indices.next().map(|&x| self.model.value_at(x))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.indices.size_hint()
    }
}

impl ExactSizeIterator for Predictions<'_> {}

/// Fit a first-degree polynomial to `(index, value)` pairs.
///
/// A single point, or points sharing one index, gives a flat line through
/// the mean value. No points is an error.
pub fn fit_linear(points: &[(f64, f64)]) -> Result<TrendModel> {
    if points.is_empty() {
        return Err(AnalyticsError::InsufficientData {
            operation: "trend fit",
            needed: 1,
            got: 0,
        });
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), &(x, y)| {
        let dx = x - mean_x;
        (sxy + dx * (y - mean_y), sxx + dx * dx)
    });

    let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
    Ok(TrendModel {
        slope,
        intercept: mean_y - slope * mean_x,
        domain: points.iter().map(|p| p.0).collect(),
    })
}

/// Synthetic positions `0, 1, 2, …` for an ordered series.
pub fn indexed(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

// ---------------------------------------------------------------------------
// Series extraction
// ---------------------------------------------------------------------------

/// One observation of the series a trend is fitted on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

/// Build the series to fit: per-date totals in chronological order when
/// `date_column` is given, otherwise the usable measures in record order.
///
/// Records without a usable measure or date are left out.
pub fn series(
    dataset: &Dataset,
    measure_column: &str,
    date_column: Option<&str>,
) -> Result<Vec<SeriesPoint>> {
    let measure_idx = dataset.column_index(measure_column)?;
    match date_column {
        Some(date_column) => {
            let date_idx = dataset.column_index(date_column)?;
            let mut totals: BTreeMap<Value, f64> = BTreeMap::new();
            for record in dataset.records() {
                let date = record.get(date_idx);
                if date.is_missing() {
                    continue;
                }
                if let Some(v) = record.number(measure_idx) {
                    *totals.entry(date.clone()).or_insert(0.0) += v;
                }
            }
            Ok(totals
                .into_iter()
                .map(|(date, value)| SeriesPoint {
                    label: date.to_string(),
                    value,
                })
                .collect())
        }
        None => Ok(dataset
            .records()
            .iter()
            .filter_map(|r| {
                r.number(measure_idx).map(|value| SeriesPoint {
                    label: format!("#{}", r.row + 1),
                    value,
                })
            })
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn fits_exact_line() {
        let model = fit_linear(&indexed(&[1.0, 3.0, 5.0, 7.0])).unwrap();
        assert!(close(model.slope, 2.0));
        assert!(close(model.intercept, 1.0));
        assert_eq!(model.direction(), Direction::Rising);
    }

    #[test]
    fn fits_noisy_points_by_least_squares() {
        // polyfit([0,1,2], [1,2,2], 1) -> slope 0.5, intercept 7/6
        let model = fit_linear(&indexed(&[1.0, 2.0, 2.0])).unwrap();
        assert!(close(model.slope, 0.5));
        assert!(close(model.intercept, 7.0 / 6.0));
    }

    #[test]
    fn single_point_is_flat_through_it() {
        let model = fit_linear(&[(3.0, 42.0)]).unwrap();
        assert_eq!(model.slope, 0.0);
        assert_eq!(model.intercept, 42.0);
        assert_eq!(model.direction(), Direction::Flat);
    }

    #[test]
    fn no_points_is_insufficient_data() {
        let err = fit_linear(&[]).unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData { got: 0, .. }));
    }

    #[test]
    fn predictions_align_with_domain_and_restart() {
        let model = fit_linear(&indexed(&[10.0, 8.0, 6.0])).unwrap();
        let first: Vec<f64> = model.predict().collect();
        let second: Vec<f64> = model.predict().collect();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        assert!(close(first[2], 6.0));
        assert_eq!(model.direction(), Direction::Falling);

        let mut iter = model.predict();
        iter.next();
        let resumed = iter.clone();
        assert_eq!(iter.collect::<Vec<_>>(), resumed.collect::<Vec<_>>());
    }

    #[test]
    fn forecast_extends_past_domain() {
        let model = fit_linear(&indexed(&[0.0, 1.0, 2.0])).unwrap();
        let ahead = model.forecast(2);
        assert!(close(ahead[0], 3.0));
        assert!(close(ahead[1], 4.0));
        assert_eq!(model.predict().len(), 3);
    }

    #[test]
    fn series_totals_per_date_in_order() {
        let ds = Dataset::from_rows(
            &["Date", "Sales"],
            vec![
                vec![Value::parse("2024-01-08"), 5.0.into()],
                vec![Value::parse("2024-01-01"), 2.0.into()],
                vec![Value::parse("2024-01-08"), 1.0.into()],
                vec![Value::Missing, 9.0.into()],
            ],
        )
        .unwrap();
        let points = series(&ds, "Sales", Some("Date")).unwrap();
        assert_eq!(
            points,
            vec![
                SeriesPoint { label: "2024-01-01".into(), value: 2.0 },
                SeriesPoint { label: "2024-01-08".into(), value: 6.0 },
            ]
        );
    }

    #[test]
    fn series_without_dates_follows_record_order() {
        let ds = Dataset::from_rows(
            &["Sales"],
            vec![vec![5.0.into()], vec!["x".into()], vec![7.0.into()]],
        )
        .unwrap();
        let labels: Vec<String> = series(&ds, "Sales", None)
            .unwrap()
            .into_iter()
            .map(|p| p.label)
            .collect();
        assert_eq!(labels, vec!["#1", "#3"]);
    }
}
