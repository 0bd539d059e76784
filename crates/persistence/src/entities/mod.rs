//! Database entities (row mappings).

pub mod area;
pub mod measurement;

pub use area::AreaEntity;
pub use measurement::MeasurementEntity;
