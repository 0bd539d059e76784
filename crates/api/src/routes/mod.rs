//! HTTP route handlers.

pub mod areas;
pub mod coordinates;
pub mod health;
pub mod measurements;
pub mod points;
pub mod sessions;
