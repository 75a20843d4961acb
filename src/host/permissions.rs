use crate::activation::{PermissionAuthority, PermissionKind, PermissionStatus};
use crate::config::SimulationConfig;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::time::Duration;
use tracing::info;

/// Permission authority answering from a fixed script.
///
/// `granted` holds what `check` reports; `grant_on_request` decides how each
/// prompt resolves. A granted prompt is remembered for later checks.
pub struct ScriptedPermissions {
    granted: Mutex<HashSet<PermissionKind>>,
    grant_on_request: HashSet<PermissionKind>,
    background_tier: bool,
    request_delay: Duration,
    requests: Mutex<Vec<PermissionKind>>,
}

impl ScriptedPermissions {
    pub fn new(background_tier: bool) -> Self {
        Self {
            granted: Mutex::new(HashSet::new()),
            grant_on_request: HashSet::new(),
            background_tier,
            request_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        let mut permissions = Self::new(config.background_tier_supported)
            .with_request_delay(Duration::from_millis(config.request_delay_ms));

        if config.foreground_granted {
            permissions = permissions.already_granted(PermissionKind::ForegroundLocation);
        }
        if config.background_granted {
            permissions = permissions.already_granted(PermissionKind::BackgroundLocation);
        }
        if config.grant_foreground_on_request {
            permissions = permissions.grants_on_request(PermissionKind::ForegroundLocation);
        }
        if config.grant_background_on_request {
            permissions = permissions.grants_on_request(PermissionKind::BackgroundLocation);
        }

        permissions
    }

    pub fn already_granted(self, kind: PermissionKind) -> Self {
        self.granted.lock().insert(kind);
        self
    }

    pub fn grants_on_request(mut self, kind: PermissionKind) -> Self {
        self.grant_on_request.insert(kind);
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Prompts issued so far, in order
    pub fn requests(&self) -> Vec<PermissionKind> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PermissionAuthority for ScriptedPermissions {
    fn check(&self, kind: PermissionKind) -> PermissionStatus {
        if self.granted.lock().contains(&kind) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    async fn request(&self, kind: PermissionKind) -> PermissionStatus {
        self.requests.lock().push(kind);

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        let status = if self.grant_on_request.contains(&kind) {
            self.granted.lock().insert(kind);
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        };

        info!("Simulated {} prompt resolved: {:?}", kind, status);
        status
    }

    fn supports_background_tier(&self) -> bool {
        self.background_tier
    }
}
