use crate::activation::PermissionAuthority;
use crate::config::SimulationConfig;
use crate::host::{
    ScriptedPermissions, SimulatedInertialHardware, SimulatedNoticeHost, SimulatedPositioning,
};
use crate::notification::NoticeSink;
use crate::position::PositioningProvider;
use crate::sensor::InertialHardware;
use std::sync::Arc;

/// Component lifecycle states
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// System shutdown reason
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    Error(String),
    UserRequest(String),
}

/// Host subsystems the orchestrator wires the core to
#[derive(Clone)]
pub struct HostCollaborators {
    pub inertial: Arc<dyn InertialHardware>,
    pub positioning: Arc<dyn PositioningProvider>,
    pub permissions: Arc<dyn PermissionAuthority>,
    pub notices: Arc<dyn NoticeSink>,
}

impl HostCollaborators {
    /// Simulated subsystems driven by the `[simulation]` section
    pub fn simulated(config: &SimulationConfig) -> Self {
        Self {
            inertial: Arc::new(SimulatedInertialHardware::from_config(config)),
            positioning: Arc::new(SimulatedPositioning::from_config(config)),
            permissions: Arc::new(ScriptedPermissions::from_config(config)),
            notices: Arc::new(SimulatedNoticeHost::new(config.notice_channels_supported)),
        }
    }
}
