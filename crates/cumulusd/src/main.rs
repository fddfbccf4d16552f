use std::process::ExitCode;
use std::sync::Arc;

use cumulusd::{StructuredHealthReporter, SystemConfigLoader, bootstrap_with, http};

fn main() -> ExitCode {
    let reporter = Arc::new(StructuredHealthReporter::new());
    let daemon = match bootstrap_with(&SystemConfigLoader, reporter) {
        Ok(daemon) => daemon,
        Err(error) => {
            // Telemetry may not be installed yet.
            eprintln!("cumulusd: {error}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!(target: "cumulusd::main", %error, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(http::serve(daemon)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "cumulusd::main", %error, "server stopped with an error");
            ExitCode::FAILURE
        }
    }
}
