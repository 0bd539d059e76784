//! Domain models for the soil survey backend.

pub mod actor;
pub mod area;
pub mod coordinates;
pub mod measurement;
pub mod point;
pub mod progress;

pub use actor::Actor;
pub use area::{Area, AreaAggregate, NewArea};
pub use coordinates::{CoordinateUpdate, GridPosition, LatLng};
pub use measurement::{
    Measurement, MeasurementFilter, MeasurementPatch, Metric, MetricValues, NewMeasurement,
    PointReading, PointStatus, SKIP_SENTINEL,
};
pub use point::{NextPoint, NextPointStrategy, PointLayout, PointStatusFilter};
pub use progress::{ProgressSnapshot, SessionState};
