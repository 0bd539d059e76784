//! Custom Axum extractors.

pub mod rejection;
pub mod user_auth;

pub use rejection::{AppJson, AppPath, AppQuery};
pub use user_auth::AuthUser;
