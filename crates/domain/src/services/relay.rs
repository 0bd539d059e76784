//! Live relay seam for pushing survey events to realtime viewers.
//!
//! Publishing is fire-and-forget: implementations enqueue and return
//! immediately, and a failed publish never undoes the stored mutation.

use std::sync::Mutex;

use serde::Serialize;
use uuid::Uuid;

use crate::models::area::AreaResponse;
use crate::models::measurement::PointResponse;

/// Event published after a successful mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    #[serde(rename_all = "camelCase")]
    PointsCreated { area_id: Uuid, point_ids: Vec<String> },
    #[serde(rename_all = "camelCase")]
    PointCompleted { area_id: Uuid, point: PointResponse },
    #[serde(rename_all = "camelCase")]
    PointSkipped {
        area_id: Uuid,
        point_id: String,
        reason: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    PointsReset { area_id: Uuid, reset_count: u64 },
    #[serde(rename_all = "camelCase")]
    AreaUpdated { area: AreaResponse },
}

impl LiveEvent {
    pub fn area_id(&self) -> Uuid {
        match self {
            LiveEvent::PointsCreated { area_id, .. }
            | LiveEvent::PointCompleted { area_id, .. }
            | LiveEvent::PointSkipped { area_id, .. }
            | LiveEvent::PointsReset { area_id, .. } => *area_id,
            LiveEvent::AreaUpdated { area } => area.area_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LiveEvent::PointsCreated { .. } => "points_created",
            LiveEvent::PointCompleted { .. } => "point_completed",
            LiveEvent::PointSkipped { .. } => "point_skipped",
            LiveEvent::PointsReset { .. } => "points_reset",
            LiveEvent::AreaUpdated { .. } => "area_updated",
        }
    }
}

/// Result of a publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayResult {
    /// Accepted for delivery.
    Queued,
    /// Relay is turned off.
    Disabled,
    /// Could not be accepted (queue full, worker gone).
    Dropped(String),
}

/// Realtime relay for live-UI consumers.
pub trait LiveRelay: Send + Sync {
    /// Hands an event to the relay without waiting for delivery.
    fn publish(&self, event: LiveEvent) -> RelayResult;
}

/// Relay that records events instead of sending them.
#[derive(Debug, Default)]
pub struct MockLiveRelay {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    events: Mutex<Vec<LiveEvent>>,
}

impl MockLiveRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock relay that drops every event.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Default::default()
        }
    }

    /// Events accepted so far.
    pub fn events(&self) -> Vec<LiveEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl LiveRelay for MockLiveRelay {
    fn publish(&self, event: LiveEvent) -> RelayResult {
        if self.simulate_failure {
            tracing::warn!(
                area_id = %event.area_id(),
                event = event.kind(),
                "Mock relay simulating failure"
            );
            return RelayResult::Dropped("Simulated failure".to_string());
        }

        tracing::debug!(
            area_id = %event.area_id(),
            event = event.kind(),
            "Mock: Would publish live event"
        );
        match self.events.lock() {
            Ok(mut events) => {
                events.push(event);
                RelayResult::Queued
            }
            Err(_) => RelayResult::Dropped("mock relay lock poisoned".to_string()),
        }
    }
}
