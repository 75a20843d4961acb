use super::state::{ActivationState, PermissionKind, PermissionStatus};
use crate::events::{EventBus, TelemetryEvent};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Host permission subsystem
#[async_trait]
pub trait PermissionAuthority: Send + Sync {
    /// Current grant status, answered synchronously
    fn check(&self, kind: PermissionKind) -> PermissionStatus;

    /// Prompt for a grant; resolves exactly once with the outcome
    async fn request(&self, kind: PermissionKind) -> PermissionStatus;

    /// Whether the platform has a background tier separate from foreground
    fn supports_background_tier(&self) -> bool;
}

pub type ActivationCallback = Box<dyn FnOnce() + Send + 'static>;

/// Owner of the session's [`ActivationState`].
///
/// [`ActivationGate::run`] performs the check-then-request sequence once;
/// later calls wait for the same terminal state. The activation callback
/// runs at most once, when `Activated` is reached.
pub struct ActivationGate {
    authority: Arc<dyn PermissionAuthority>,
    state: watch::Sender<ActivationState>,
    started: AtomicBool,
    on_activated: Mutex<Option<ActivationCallback>>,
    event_bus: Option<Arc<EventBus>>,
}

impl ActivationGate {
    pub fn new(authority: Arc<dyn PermissionAuthority>) -> Self {
        let (state, _) = watch::channel(ActivationState::Unchecked);
        Self {
            authority,
            state,
            started: AtomicBool::new(false),
            on_activated: Mutex::new(None),
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn state(&self) -> ActivationState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ActivationState> {
        self.state.subscribe()
    }

    pub fn supports_background_tier(&self) -> bool {
        self.authority.supports_background_tier()
    }

    pub fn status_message(&self) -> &'static str {
        self.state().status_message(self.supports_background_tier())
    }

    /// Register the callback run on activation. If the gate is already
    /// activated it runs immediately. A later registration replaces an
    /// earlier one that has not run yet.
    pub fn on_activated<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut slot = self.on_activated.lock();
        if self.state() == ActivationState::Activated {
            drop(slot);
            callback();
        } else {
            *slot = Some(Box::new(callback));
        }
    }

    /// Wait until a terminal state is reached
    pub async fn wait_for_terminal(&self) -> ActivationState {
        let mut receiver = self.state.subscribe();
        let state = match receiver.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        state
    }

    /// Run the authorization sequence
    pub async fn run(&self) -> ActivationState {
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("Activation sequence already started, waiting for its outcome");
            return self.wait_for_terminal().await;
        }

        info!("Checking location permissions");

        let foreground = match self.authority.check(PermissionKind::ForegroundLocation) {
            PermissionStatus::Granted => true,
            PermissionStatus::Denied => {
                self.transition(ActivationState::RequestingForeground).await;
                self.authority
                    .request(PermissionKind::ForegroundLocation)
                    .await
                    .is_granted()
            }
        };

        if !foreground {
            self.transition(ActivationState::ForegroundDenied).await;
            return self.state();
        }

        if !self.authority.supports_background_tier() {
            self.transition(ActivationState::Activated).await;
            return self.state();
        }

        let background = match self.authority.check(PermissionKind::BackgroundLocation) {
            PermissionStatus::Granted => true,
            PermissionStatus::Denied => {
                self.transition(ActivationState::RequestingBackground).await;
                self.authority
                    .request(PermissionKind::BackgroundLocation)
                    .await
                    .is_granted()
            }
        };

        if background {
            self.transition(ActivationState::Activated).await;
        } else {
            self.transition(ActivationState::BackgroundDenied).await;
        }

        self.state()
    }

    async fn transition(&self, next: ActivationState) -> bool {
        let mut previous = None;
        self.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                previous = Some(*current);
                *current = next;
                true
            } else {
                false
            }
        });

        let Some(previous) = previous else {
            warn!("Rejected activation transition to {} from {}", next, self.state());
            return false;
        };
        debug!("Activation {} -> {}", previous, next);

        if let Some(event_bus) = &self.event_bus {
            let _ = event_bus
                .publish(TelemetryEvent::ActivationChanged {
                    state: next,
                    timestamp: SystemTime::now(),
                })
                .await;
        }

        if next == ActivationState::Activated {
            let callback = self.on_activated.lock().take();
            if let Some(callback) = callback {
                info!("Location access activated, running activation callback");
                callback();
            }
        }

        true
    }
}
