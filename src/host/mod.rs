//! Simulated host collaborators.
//!
//! These stand in for the platform subsystems behind the core's traits and
//! double as test doubles: each one counts the calls it receives.

mod inertial;
mod notice;
mod permissions;
mod positioning;

pub use inertial::SimulatedInertialHardware;
pub use notice::SimulatedNoticeHost;
pub use permissions::ScriptedPermissions;
pub use positioning::SimulatedPositioning;
