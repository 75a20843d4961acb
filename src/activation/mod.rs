mod gate;
mod state;


pub use gate::{ActivationCallback, ActivationGate, PermissionAuthority};
pub use state::{ActivationState, PermissionKind, PermissionStatus};
