//! Coordinate coverage and grid-based estimation over an area's points.

use crate::models::coordinates::{
    CoordinateBounds, CoordinateCounts, EstimateCoordinatesRequest, EstimatedPoint, GpsStatistics,
};
use crate::models::{GridPosition, LatLng, Measurement};

/// Minimum digit count of counter ids such as `P001`.
const COUNTER_DIGITS: usize = 3;

/// Counts located and unlocated rows.
pub fn count_coordinates<'a>(points: impl IntoIterator<Item = &'a Measurement>) -> CoordinateCounts {
    let mut counts = CoordinateCounts::default();
    for point in points {
        counts.total_points += 1;
        if LatLng::of(point).is_some() {
            counts.points_with_coordinates += 1;
        } else {
            counts.points_without_coordinates += 1;
        }
    }
    counts
}

/// Coverage, bounding box and centroid of the area's located points.
pub fn compute_gps_statistics(points: &[Measurement]) -> GpsStatistics {
    let points: Vec<&Measurement> = points.iter().filter(|p| p.is_point()).collect();
    let counts = count_coordinates(points.iter().copied());
    let located: Vec<LatLng> = points.iter().filter_map(|p| LatLng::of(p)).collect();

    let coverage_percentage = if counts.total_points == 0 {
        0
    } else {
        (counts.points_with_coordinates as f64 / counts.total_points as f64 * 100.0).round() as u32
    };

    let bounds = located.split_first().map(|(first, rest)| {
        rest.iter().fold(
            CoordinateBounds {
                min_lat: first.lat,
                max_lat: first.lat,
                min_lng: first.lng,
                max_lng: first.lng,
            },
            |b, p| CoordinateBounds {
                min_lat: b.min_lat.min(p.lat),
                max_lat: b.max_lat.max(p.lat),
                min_lng: b.min_lng.min(p.lng),
                max_lng: b.max_lng.max(p.lng),
            },
        )
    });

    let center = (!located.is_empty()).then(|| {
        let n = located.len() as f64;
        let (lat, lng) = located
            .iter()
            .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
        LatLng::rounded(lat / n, lng / n)
    });

    GpsStatistics {
        counts,
        coverage_percentage,
        bounds,
        center,
    }
}

/// Maps a point id onto a zero-based grid cell.
///
/// Counter ids (`P` followed by at least three digits) run row by row across
/// `grid_cols` columns. Lettered ids (`B4`) take the row from the letter and
/// the column from the number. Anything else lands on the origin.
pub fn grid_position(point_id: &str, grid_cols: u32) -> GridPosition {
    let mut chars = point_id.chars();
    let Some(letter) = chars.next().filter(char::is_ascii_uppercase) else {
        return GridPosition::default();
    };
    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return GridPosition::default();
    }
    let Ok(number) = digits.parse::<u32>() else {
        return GridPosition::default();
    };
    let index = number.saturating_sub(1);

    if letter == 'P' && digits.len() >= COUNTER_DIGITS {
        let cols = grid_cols.max(1);
        GridPosition {
            row: index / cols,
            col: index % cols,
        }
    } else {
        GridPosition {
            row: u32::from(letter) - u32::from('A'),
            col: index,
        }
    }
}

/// Estimates coordinates for every point that lacks them.
pub fn estimate_missing(
    points: &[Measurement],
    grid: &EstimateCoordinatesRequest,
) -> Vec<EstimatedPoint> {
    points
        .iter()
        .filter(|p| LatLng::of(p).is_none())
        .filter_map(|p| {
            let point_id = p.point_id.clone()?;
            let grid_position = grid_position(&point_id, grid.grid_cols);
            Some(EstimatedPoint {
                estimated_coordinates: LatLng::rounded(
                    grid.start_lat + f64::from(grid_position.row) * grid.lat_spacing,
                    grid.start_lng + f64::from(grid_position.col) * grid.lng_spacing,
                ),
                measurement_id: p.measurement_id,
                point_id,
                grid_position,
            })
        })
        .collect()
}
