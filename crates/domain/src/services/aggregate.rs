//! Area aggregate engine.
//!
//! Averages and the total are always recomputed from the full measurement
//! set of an area, never adjusted incrementally.

use serde::{Deserialize, Serialize};

use crate::models::measurement::round2;
use crate::models::progress::MetricStatistics;
use crate::models::{AreaAggregate, Measurement, Metric, MetricValues, PointStatus, SKIP_SENTINEL};

/// How `total_measurements` is counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalCountPolicy {
    /// Every row associated with the area, placeholders included.
    #[default]
    AllRows,
    /// Visited rows only: measured and skipped.
    RecordedRows,
    /// Measured rows with all six metrics present.
    CompleteRows,
}

impl TotalCountPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalCountPolicy::AllRows => "all_rows",
            TotalCountPolicy::RecordedRows => "recorded_rows",
            TotalCountPolicy::CompleteRows => "complete_rows",
        }
    }
}

impl std::str::FromStr for TotalCountPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_rows" => Ok(TotalCountPolicy::AllRows),
            "recorded_rows" => Ok(TotalCountPolicy::RecordedRows),
            "complete_rows" => Ok(TotalCountPolicy::CompleteRows),
            other => Err(format!("unknown total count policy '{}'", other)),
        }
    }
}

fn metric_samples<'a>(
    measurements: &'a [Measurement],
    metric: Metric,
) -> impl Iterator<Item = f64> + 'a {
    measurements
        .iter()
        .filter(|m| m.status() == PointStatus::Measured)
        .filter_map(move |m| m.values.get(metric))
        .filter(|v| *v != SKIP_SENTINEL && v.is_finite())
}

/// Computes the aggregate for an area's measurements.
///
/// Each average is the mean over measured rows carrying that metric and is
/// `None` when no such row exists, so an area whose points were all reset
/// reports no averages.
pub fn compute_area_aggregate(
    measurements: &[Measurement],
    policy: TotalCountPolicy,
) -> AreaAggregate {
    let mut averages = MetricValues::default();
    for metric in Metric::ALL {
        let (sum, count) = metric_samples(measurements, metric)
            .fold((0.0_f64, 0_u32), |(sum, count), v| (sum + v, count + 1));
        if count > 0 {
            averages.set(metric, Some(round2(sum / f64::from(count))));
        }
    }

    let total = match policy {
        TotalCountPolicy::AllRows => measurements.len(),
        TotalCountPolicy::RecordedRows => measurements
            .iter()
            .filter(|m| m.status() != PointStatus::Unmeasured)
            .count(),
        TotalCountPolicy::CompleteRows => measurements
            .iter()
            .filter(|m| m.status() == PointStatus::Measured && m.values.is_complete())
            .count(),
    };

    AreaAggregate {
        averages,
        total_measurements: i32::try_from(total).unwrap_or(i32::MAX),
    }
}

/// Per-metric average and range over measured rows. Metrics without samples are omitted.
pub fn compute_metric_statistics(measurements: &[Measurement]) -> Vec<MetricStatistics> {
    Metric::ALL
        .iter()
        .filter_map(|metric| {
            let mut count = 0_u32;
            let mut sum = 0.0_f64;
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for v in metric_samples(measurements, *metric) {
                count += 1;
                sum += v;
                min = min.min(v);
                max = max.max(v);
            }
            (count > 0).then(|| MetricStatistics {
                metric: *metric,
                count,
                average: round2(sum / f64::from(count)),
                min,
                max,
            })
        })
        .collect()
}
