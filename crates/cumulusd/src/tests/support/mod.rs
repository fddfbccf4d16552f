//! Shared doubles and worlds for the server test suites.

mod config_loader;
mod reporter;
#[path = "rest_world.rs"]
mod rest_world_support;
#[path = "world.rs"]
mod world_support;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use rest_world_support::{RestWorld, rest_world};
pub use world_support::{TestWorld, world};
