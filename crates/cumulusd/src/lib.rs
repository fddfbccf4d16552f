//! Cumulus file-operation server.
//!
//! The server exposes a small REST command API for moving, copying, packing
//! and extracting files beneath a configured root directory. Requests outside
//! the API prefix are left to the surrounding HTTP stack.
//!
//! Startup follows a fixed sequence: load configuration through a
//! [`ConfigLoader`], install structured telemetry, prepare the listen socket,
//! then hand the resulting [`Daemon`] to [`http::serve`]. Every stage is
//! reported through a [`HealthReporter`] so operators can see where a failed
//! start stopped.
//!
//! Long-running operations are delegated to the capabilities in
//! [`cumulus_archive`]. Their progress goes to the operational log; clients
//! only see the single reply sent when the operation ends.

mod bootstrap;
mod health;
pub mod http;
pub mod rest;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
