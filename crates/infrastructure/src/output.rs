use tracing::{error, info};

use domain::output::OutputLog;

/// Operator output forwarded to `tracing` under its own target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingOutputLog;

impl OutputLog for TracingOutputLog {
    fn info(&self, message: &str) {
        info!(target: "pipeline_explorer::output", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: "pipeline_explorer::output", "{}", message);
    }
}
