//! Domain services for the soil survey backend.
//!
//! The aggregate, coordinates, sequencer and progress modules are pure functions over
//! measurement rows; `survey` wires them to a store and a live relay.

pub mod aggregate;
pub mod coordinates;
pub mod memory_store;
pub mod progress;
pub mod relay;
pub mod sequencer;
pub mod store;
pub mod survey;

pub use aggregate::{compute_area_aggregate, compute_metric_statistics, TotalCountPolicy};
pub use memory_store::InMemoryAreaStore;
pub use relay::{LiveEvent, LiveRelay, MockLiveRelay, RelayResult};
pub use store::AreaStore;
pub use survey::{SurveyService, SurveySettings};
