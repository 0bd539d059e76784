//! Progress, session and statistics views of an area's points.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::measurement::{Metric, PointResponse};

/// Point counts and completion for an area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub total_points: u32,
    pub measured_points: u32,
    pub skipped_points: u32,
    pub unmeasured_points: u32,
    /// Share of measured points, rounded to a whole percent.
    pub completion_percentage: u32,
    pub is_complete: bool,
}

/// Derived survey session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Complete,
}

impl ProgressSnapshot {
    pub fn visited_points(&self) -> u32 {
        self.measured_points + self.skipped_points
    }

    pub fn session_state(&self) -> SessionState {
        if self.is_complete {
            SessionState::Complete
        } else if self.visited_points() == 0 {
            SessionState::NotStarted
        } else {
            SessionState::InProgress
        }
    }
}

fn default_interval_secs() -> u32 {
    30
}

fn default_auto_advance() -> bool {
    true
}

/// Request payload for starting a survey session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[serde(default = "default_interval_secs")]
    #[validate(range(min = 1, max = 3600, message = "Interval must be between 1 and 3600 seconds"))]
    pub measurement_interval_secs: u32,

    #[serde(default = "default_auto_advance")]
    pub auto_advance: bool,

    #[validate(length(min = 1, max = 64, message = "Device ID must be 1-64 characters"))]
    pub device_id: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Session name must be 1-100 characters"))]
    pub session_name: Option<String>,
}

impl Default for StartSessionRequest {
    fn default() -> Self {
        Self {
            measurement_interval_secs: default_interval_secs(),
            auto_advance: default_auto_advance(),
            device_id: None,
            session_name: None,
        }
    }
}

/// Response for starting a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub area_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub current_point: PointResponse,
    pub progress: ProgressSnapshot,
    pub settings: StartSessionRequest,
}

/// Response for the session status view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub area_id: Uuid,
    pub state: SessionState,
    pub progress: ProgressSnapshot,
    pub first_measurement_date: Option<NaiveDate>,
    pub last_measurement_date: Option<NaiveDate>,
    pub next_point: Option<PointResponse>,
}

/// Average and range of one metric over measured points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStatistics {
    pub metric: Metric,
    pub count: u32,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

/// Response for area statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaStatisticsResponse {
    pub area_id: Uuid,
    pub progress: ProgressSnapshot,
    pub metrics: Vec<MetricStatistics>,
}
