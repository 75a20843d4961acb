use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization tiers the gate sequences through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionKind {
    ForegroundLocation,
    BackgroundLocation,
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKind::ForegroundLocation => f.write_str("foreground location"),
            PermissionKind::BackgroundLocation => f.write_str("background location"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Session-wide authorization state. Transitions only move forward and the
/// three terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActivationState {
    #[default]
    Unchecked,
    RequestingForeground,
    ForegroundDenied,
    RequestingBackground,
    /// Foreground capability is retained
    BackgroundDenied,
    Activated,
}

impl ActivationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActivationState::ForegroundDenied
                | ActivationState::BackgroundDenied
                | ActivationState::Activated
        )
    }

    /// Whether foreground consumers may read the position stream
    pub fn permits_consumption(&self) -> bool {
        matches!(
            self,
            ActivationState::Activated | ActivationState::BackgroundDenied
        )
    }

    pub fn can_transition_to(&self, next: ActivationState) -> bool {
        use ActivationState::*;

        matches!(
            (self, next),
            (Unchecked, RequestingForeground)
                | (Unchecked, RequestingBackground)
                | (Unchecked, Activated)
                | (RequestingForeground, ForegroundDenied)
                | (RequestingForeground, RequestingBackground)
                | (RequestingForeground, Activated)
                | (RequestingBackground, BackgroundDenied)
                | (RequestingBackground, Activated)
        )
    }

    /// User-facing status line. `background_tier` selects the wording of
    /// the activated message on platforms without a separate background tier.
    pub fn status_message(&self, background_tier: bool) -> &'static str {
        match self {
            ActivationState::Unchecked => "Checking permissions...",
            ActivationState::RequestingForeground => "Requesting foreground location permission...",
            ActivationState::ForegroundDenied => "Foreground location permission denied",
            ActivationState::RequestingBackground => "Requesting background location permission...",
            ActivationState::BackgroundDenied => "Background location permission denied",
            ActivationState::Activated if background_tier => "All location permissions granted",
            ActivationState::Activated => "Location permission granted",
        }
    }
}

impl fmt::Display for ActivationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivationState::Unchecked => "unchecked",
            ActivationState::RequestingForeground => "requesting_foreground",
            ActivationState::ForegroundDenied => "foreground_denied",
            ActivationState::RequestingBackground => "requesting_background",
            ActivationState::BackgroundDenied => "background_denied",
            ActivationState::Activated => "activated",
        };
        f.write_str(name)
    }
}
