pub mod activation;
pub mod app;
pub mod classifier;
pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod host;
pub mod keyboard_input;
pub mod notification;
pub mod position;
pub mod sensor;

pub use activation::{ActivationGate, ActivationState, PermissionAuthority, PermissionKind};
pub use app::{ComponentState, HostCollaborators, ShutdownReason, TelemetryOrchestrator};
pub use classifier::{classify, classify_with, MotionClassification, MotionThresholds};
pub use config::TelemetryConfig;
pub use console::{ConsoleReporter, ReportFormat};
pub use error::{Result, TelemetryError};
pub use events::{EventBus, EventFilter, EventReceiver, TelemetryEvent};
pub use notification::{Notice, NoticeSink, NotificationBridge};
pub use position::{LocationFix, PositionStream, PositioningProvider, Subscription};
pub use sensor::{InertialHardware, Sample3, SensorChannel, SensorKind};
