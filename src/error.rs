use crate::sensor::SensorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Position error: {0}")]
    Position(#[from] PositionError),

    #[error("Notice error: {0}")]
    Notice(#[from] NoticeError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl TelemetryError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures reported by the inertial hardware subsystem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("Failed to register {kind} listener: {details}")]
    RegistrationFailed { kind: SensorKind, details: String },
}

/// Failures reported by the positioning subsystem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PositionError {
    #[error("Failed to register for location updates: {details}")]
    RegistrationFailed { details: String },
}

/// Failures reported by the background-notice subsystem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NoticeError {
    #[error("Notice channels are not supported on this platform")]
    ChannelUnsupported,

    #[error("Failed to post notice: {details}")]
    PostFailed { details: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
