//! Survey point models: generation layouts, filters and sequencing views.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::measurement::{PointResponse, PointStatus};
use super::progress::ProgressSnapshot;
use super::area::AreaResponse;
use crate::error::DomainError;

/// Grid layout: rows are lettered `A..`, columns numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GridSpec {
    #[validate(range(min = 1, max = 26, message = "Rows must be between 1 and 26"))]
    pub rows: u32,

    #[validate(range(min = 1, max = 999, message = "Columns must be between 1 and 999"))]
    pub cols: u32,
}

/// Prefixed counter layout, e.g. `A001..A025`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PatternSpec {
    #[validate(length(min = 1, max = 16, message = "Prefix must be 1-16 characters"))]
    #[validate(regex(path = *shared::validation::POINT_ID_REGEX, message = "Invalid prefix"))]
    pub prefix: String,

    #[validate(range(min = 1, message = "Count must be at least 1"))]
    pub count: u32,
}

/// Resolved point generation layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointLayout {
    Explicit(Vec<String>),
    Grid(GridSpec),
    Pattern(PatternSpec),
    Count(u32),
}

/// Request payload for creating points. Exactly one layout must be set.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePointsRequest {
    #[validate(custom(function = "shared::validation::validate_point_ids"))]
    pub point_ids: Option<Vec<String>>,

    #[validate(nested)]
    pub grid: Option<GridSpec>,

    #[validate(nested)]
    pub pattern: Option<PatternSpec>,

    #[validate(range(min = 1, message = "Count must be at least 1"))]
    pub count: Option<u32>,
}

impl CreatePointsRequest {
    /// Resolves the single layout carried by the request.
    pub fn layout(self) -> Result<PointLayout, DomainError> {
        let supplied = [
            self.point_ids.is_some(),
            self.grid.is_some(),
            self.pattern.is_some(),
            self.count.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if supplied != 1 {
            return Err(DomainError::InvalidArgument(
                "Exactly one of pointIds, grid, pattern or count must be provided".into(),
            ));
        }

        Ok(if let Some(ids) = self.point_ids {
            PointLayout::Explicit(ids)
        } else if let Some(grid) = self.grid {
            PointLayout::Grid(grid)
        } else if let Some(pattern) = self.pattern {
            PointLayout::Pattern(pattern)
        } else {
            PointLayout::Count(self.count.unwrap_or_default())
        })
    }
}

/// Status filter for listing points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointStatusFilter {
    #[default]
    All,
    Measured,
    Unmeasured,
    Skipped,
}

impl PointStatusFilter {
    pub fn matches(&self, status: PointStatus) -> bool {
        match self {
            PointStatusFilter::All => true,
            PointStatusFilter::Measured => status == PointStatus::Measured,
            PointStatusFilter::Unmeasured => status == PointStatus::Unmeasured,
            PointStatusFilter::Skipped => status == PointStatus::Skipped,
        }
    }
}

/// Selection policy for the next unmeasured point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextPointStrategy {
    #[default]
    Sequential,
    Random,
    /// Same order as sequential until points carry a priority.
    Priority,
}

/// Query parameters for listing points.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPointsQuery {
    #[serde(default)]
    pub status: PointStatusFilter,
}

/// Query parameters for the next-point lookup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextPointQuery {
    #[serde(default)]
    pub strategy: NextPointStrategy,
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Response for point creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePointsResponse {
    pub area_id: Uuid,
    pub point_ids: Vec<String>,
    pub measurement_ids: Vec<i64>,
    pub total: usize,
}

/// Response for listing points.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPointsResponse {
    pub area_id: Uuid,
    pub status: PointStatusFilter,
    pub points: Vec<PointResponse>,
    pub total: usize,
}

/// Result of a next-point lookup: a point, or the completion sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum NextPoint {
    Point(PointResponse),
    Complete,
}

impl NextPoint {
    pub fn into_point(self) -> Option<PointResponse> {
        match self {
            NextPoint::Point(p) => Some(p),
            NextPoint::Complete => None,
        }
    }
}

/// Response for the next-point lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextPointResponse {
    pub area_id: Uuid,
    pub strategy: NextPointStrategy,
    pub complete: bool,
    pub point: Option<PointResponse>,
}

/// Response for completing a point.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMeasurementResponse {
    pub completed: PointResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PointResponse>,
    pub progress: ProgressSnapshot,
    pub area: AreaResponse,
}

/// Response for skipping a point.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipPointResponse {
    pub skipped: PointResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub next: Option<PointResponse>,
    pub progress: ProgressSnapshot,
}

/// Response for resetting all points of an area.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPointsResponse {
    pub area_id: Uuid,
    pub reset_count: u64,
    pub progress: ProgressSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_requires_exactly_one() {
        let none = CreatePointsRequest::default();
        assert!(matches!(none.layout(), Err(DomainError::InvalidArgument(_))));

        let two: CreatePointsRequest =
            serde_json::from_str(r#"{"count":5,"grid":{"rows":2,"cols":2}}"#).unwrap();
        assert!(matches!(two.layout(), Err(DomainError::InvalidArgument(_))));
    }

    #[test]
    fn test_layout_resolution() {
        let grid: CreatePointsRequest =
            serde_json::from_str(r#"{"grid":{"rows":2,"cols":3}}"#).unwrap();
        assert_eq!(
            grid.layout().unwrap(),
            PointLayout::Grid(GridSpec { rows: 2, cols: 3 })
        );

        let explicit: CreatePointsRequest =
            serde_json::from_str(r#"{"pointIds":["X1","X2"]}"#).unwrap();
        assert_eq!(
            explicit.layout().unwrap(),
            PointLayout::Explicit(vec!["X1".into(), "X2".into()])
        );

        let pattern: CreatePointsRequest =
            serde_json::from_str(r#"{"pattern":{"prefix":"A","count":25}}"#).unwrap();
        assert!(matches!(pattern.layout().unwrap(), PointLayout::Pattern(_)));

        let count: CreatePointsRequest = serde_json::from_str(r#"{"count":25}"#).unwrap();
        assert_eq!(count.layout().unwrap(), PointLayout::Count(25));
    }

    #[test]
    fn test_request_validation() {
        let rows: CreatePointsRequest =
            serde_json::from_str(r#"{"grid":{"rows":27,"cols":2}}"#).unwrap();
        assert!(rows.validate().is_err());

        let zero: CreatePointsRequest = serde_json::from_str(r#"{"count":0}"#).unwrap();
        assert!(zero.validate().is_err());

        let empty_ids: CreatePointsRequest = serde_json::from_str(r#"{"pointIds":[]}"#).unwrap();
        assert!(empty_ids.validate().is_err());

        let ok: CreatePointsRequest =
            serde_json::from_str(r#"{"pattern":{"prefix":"R","count":3}}"#).unwrap();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_status_filter() {
        assert!(PointStatusFilter::All.matches(PointStatus::Skipped));
        assert!(!PointStatusFilter::Measured.matches(PointStatus::Skipped));
        assert!(PointStatusFilter::Unmeasured.matches(PointStatus::Unmeasured));
    }

    #[test]
    fn test_query_defaults() {
        let q: NextPointQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.strategy, NextPointStrategy::Sequential);
        let q: ListPointsQuery = serde_json::from_str(r#"{"status":"unmeasured"}"#).unwrap();
        assert_eq!(q.status, PointStatusFilter::Unmeasured);
    }
}
