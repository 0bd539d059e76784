//! External service integrations.

pub mod firebase_relay;

pub use firebase_relay::{DisabledRelay, FirebaseRelay, RelayError};
