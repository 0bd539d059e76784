//! Point sequencer: id generation, filtering and next-point selection.

use rand::seq::SliceRandom;

use crate::models::measurement::PointResponse;
use crate::models::{Measurement, NextPoint, NextPointStrategy, PointLayout, PointStatus, PointStatusFilter};

/// Minimum width of generated numeric suffixes (`P001`).
const MIN_PAD_WIDTH: usize = 3;

fn pad_width(count: u32) -> usize {
    count.to_string().len().max(MIN_PAD_WIDTH)
}

/// Generates point ids for a layout, in creation order.
///
/// Numeric suffixes are zero-padded to at least three digits, wider when the
/// count needs it, so lexicographic order matches numeric order.
pub fn generate_point_ids(layout: &PointLayout) -> Vec<String> {
    match layout {
        PointLayout::Explicit(ids) => ids.clone(),
        PointLayout::Grid(grid) => (0..grid.rows)
            .flat_map(|row| {
                let letter = char::from(b'A' + row as u8);
                (1..=grid.cols).map(move |col| format!("{}{}", letter, col))
            })
            .collect(),
        PointLayout::Pattern(pattern) => {
            let width = pad_width(pattern.count);
            (1..=pattern.count)
                .map(|i| format!("{}{:0width$}", pattern.prefix, i, width = width))
                .collect()
        }
        PointLayout::Count(count) => {
            let width = pad_width(*count);
            (1..=*count)
                .map(|i| format!("P{:0width$}", i, width = width))
                .collect()
        }
    }
}

/// Number of ids a layout will produce, without generating them.
pub fn layout_size(layout: &PointLayout) -> u64 {
    match layout {
        PointLayout::Explicit(ids) => ids.len() as u64,
        PointLayout::Grid(grid) => u64::from(grid.rows) * u64::from(grid.cols),
        PointLayout::Pattern(pattern) => u64::from(pattern.count),
        PointLayout::Count(count) => u64::from(*count),
    }
}

/// Sorts points by `point_id` ascending (byte order).
pub fn sort_points(points: &mut [Measurement]) {
    points.sort_by(|a, b| a.point_id.cmp(&b.point_id));
}

/// Keeps the points matching `filter`, ordered by `point_id`.
pub fn filter_points(mut points: Vec<Measurement>, filter: PointStatusFilter) -> Vec<Measurement> {
    points.retain(|p| p.is_point() && filter.matches(p.status()));
    sort_points(&mut points);
    points
}

/// Picks the next unmeasured point, or `Complete` when none remain.
pub fn select_next(points: &[Measurement], strategy: NextPointStrategy) -> NextPoint {
    let mut pending: Vec<&Measurement> = points
        .iter()
        .filter(|p| p.is_point() && p.status() == PointStatus::Unmeasured)
        .collect();

    let chosen = match strategy {
        NextPointStrategy::Sequential | NextPointStrategy::Priority => {
            pending.sort_by(|a, b| a.point_id.cmp(&b.point_id));
            pending.first().copied()
        }
        NextPointStrategy::Random => pending.choose(&mut rand::thread_rng()).copied(),
    };

    match chosen {
        Some(point) => NextPoint::Point(PointResponse::from(point.clone())),
        None => NextPoint::Complete,
    }
}
