//! Fault reporting seam for unrecovered errors inside work functions.
//!
//! The runner catches any error a job surfaces, hands it to the configured
//! reporter, and maps the job to `Failed`. Reporting is fire-and-forget; the
//! fault itself never reaches the observer.

/// Receives unrecovered faults for persistent recording.
pub trait FaultReporter: Send + Sync {
    /// `context` names the failing job (title); `err` is the full chain.
    fn report(&self, context: &str, err: &anyhow::Error);
}

/// Default reporter: record the fault in the structured log.
#[derive(Debug, Default)]
pub struct LogFaultReporter;

impl FaultReporter for LogFaultReporter {
    fn report(&self, context: &str, err: &anyhow::Error) {
        tracing::error!(job = context, "unrecovered job fault: {:#}", err);
    }
}
