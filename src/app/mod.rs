mod control;
mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use control::SensorControl;
pub use orchestrator::TelemetryOrchestrator;
pub use types::{ComponentState, HostCollaborators, ShutdownReason};
