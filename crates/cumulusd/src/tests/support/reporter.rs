//! [`HealthReporter`] double that records lifecycle events for assertions.

use std::sync::Mutex;

use cumulus_config::{Config, ListenEndpoint};

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Lifecycle events observed during a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ServerListening(String),
    ServerStopped,
}

/// Reporter that stores every event in order.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events.lock().expect("reporter mutex poisoned").clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn server_listening(&self, endpoint: &ListenEndpoint) {
        self.record(HealthEvent::ServerListening(endpoint.to_string()));
    }

    fn server_stopped(&self) {
        self.record(HealthEvent::ServerStopped);
    }
}
