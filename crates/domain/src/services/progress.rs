//! Session/progress tracker. Pure views over an area's points.

use chrono::NaiveDate;

use crate::models::{Measurement, PointStatus, ProgressSnapshot};

/// Counts point states. Rows without a `point_id` are not points and are ignored.
pub fn compute_progress(points: &[Measurement]) -> ProgressSnapshot {
    let mut snapshot = ProgressSnapshot::default();
    for point in points.iter().filter(|p| p.is_point()) {
        snapshot.total_points += 1;
        match point.status() {
            PointStatus::Measured => snapshot.measured_points += 1,
            PointStatus::Skipped => snapshot.skipped_points += 1,
            PointStatus::Unmeasured => snapshot.unmeasured_points += 1,
        }
    }

    snapshot.completion_percentage = if snapshot.total_points == 0 {
        0
    } else {
        (f64::from(snapshot.measured_points) / f64::from(snapshot.total_points) * 100.0).round()
            as u32
    };
    snapshot.is_complete = snapshot.unmeasured_points == 0;
    snapshot
}

/// First and last measurement dates among visited points.
pub fn measurement_date_range(points: &[Measurement]) -> (Option<NaiveDate>, Option<NaiveDate>) {
    let dates = points
        .iter()
        .filter(|p| p.is_point())
        .filter_map(|p| p.measurement_date);
    dates.fold((None, None), |(first, last), d| {
        (
            Some(first.map_or(d, |f: NaiveDate| f.min(d))),
            Some(last.map_or(d, |l: NaiveDate| l.max(d))),
        )
    })
}
