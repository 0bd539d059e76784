//! Repository implementations for database operations.

pub mod area;
pub mod measurement;

pub use area::AreaRepository;
pub use measurement::MeasurementRepository;
