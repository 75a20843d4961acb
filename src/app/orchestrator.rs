use super::control::SensorControl;
use super::types::{ComponentState, HostCollaborators, ShutdownReason};
use crate::activation::ActivationGate;
use crate::classifier::MotionThresholds;
use crate::config::TelemetryConfig;
use crate::console::{ConsoleReporter, ReportFormat};
use crate::error::Result;
use crate::events::EventBus;
use crate::keyboard_input::KeyboardInputHandler;
use crate::notification::NotificationBridge;
use crate::position::PositionStream;
use crate::sensor::{SensorChannel, SensorKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

pub(super) type ShutdownSlot = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

/// Main application coordinator that wires the telemetry core together
pub struct TelemetryOrchestrator {
    pub(super) config: TelemetryConfig,
    pub(super) session_id: Uuid,
    pub(super) event_bus: Arc<EventBus>,

    // Components
    pub(super) sensors: SensorControl,
    pub(super) position_stream: PositionStream,
    pub(super) activation_gate: Arc<ActivationGate>,
    pub(super) notification_bridge: Arc<NotificationBridge>,
    pub(super) console: Arc<ConsoleReporter>,
    pub(super) console_enabled: bool,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: ShutdownSlot,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
    pub(super) tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl TelemetryOrchestrator {
    /// Create an orchestrator over the simulated host subsystems
    pub fn new(config: TelemetryConfig) -> Result<Self> {
        let hosts = HostCollaborators::simulated(&config.simulation);
        Self::with_collaborators(config, hosts)
    }

    /// Create an orchestrator over the given host subsystems
    pub fn with_collaborators(config: TelemetryConfig, hosts: HostCollaborators) -> Result<Self> {
        config.validate()?;

        let session_id = Uuid::new_v4();
        info!("Creating telemetry session {}", session_id);

        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        let accelerometer = Arc::new(SensorChannel::new(
            SensorKind::Accelerometer,
            config.sensors.rate,
            Arc::clone(&hosts.inertial),
        ));
        let gyroscope = Arc::new(SensorChannel::new(
            SensorKind::Gyroscope,
            config.sensors.rate,
            Arc::clone(&hosts.inertial),
        ));
        let sensors = SensorControl::new(
            Arc::clone(&accelerometer),
            Arc::clone(&gyroscope),
            Arc::clone(&event_bus),
        );

        let position_stream =
            PositionStream::from_config(Arc::clone(&hosts.positioning), &config.position);

        let activation_gate = Arc::new(
            ActivationGate::new(Arc::clone(&hosts.permissions))
                .with_event_bus(Arc::clone(&event_bus)),
        );

        let notification_bridge = Arc::new(NotificationBridge::new(
            position_stream.clone(),
            Arc::clone(&hosts.notices),
            config.notification.clone(),
            Arc::clone(&event_bus),
        ));

        let console = Arc::new(ConsoleReporter::new(
            session_id.to_string(),
            accelerometer,
            gyroscope,
            position_stream.clone(),
            Arc::clone(&activation_gate),
            MotionThresholds::from(&config.classifier),
            Duration::from_secs(config.system.report_interval_seconds),
            ReportFormat::Text,
        ));

        let keyboard_handler = Some(KeyboardInputHandler::new(Arc::clone(&event_bus)));
        let keyboard_enabled = config.system.keyboard_enabled;

        Ok(Self {
            config,
            session_id,
            event_bus,
            sensors,
            position_stream,
            activation_gate,
            notification_bridge,
            console,
            console_enabled: true,
            keyboard_handler,
            keyboard_enabled,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Enable or disable the keyboard input handler
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    /// Enable or disable the periodic console report
    pub fn set_console_enabled(&mut self, enabled: bool) {
        self.console_enabled = enabled;
    }

    /// Choose how the console report is rendered; takes effect before `start`
    pub fn set_report_format(&mut self, format: ReportFormat) {
        self.console = Arc::new(ConsoleReporter::new(
            self.session_id.to_string(),
            Arc::clone(&self.sensors.accelerometer),
            Arc::clone(&self.sensors.gyroscope),
            self.position_stream.clone(),
            Arc::clone(&self.activation_gate),
            MotionThresholds::from(&self.config.classifier),
            Duration::from_secs(self.config.system.report_interval_seconds),
            format,
        ));
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn sensor(&self, kind: SensorKind) -> Arc<SensorChannel> {
        Arc::clone(self.sensors.channel(kind))
    }

    pub fn position_stream(&self) -> PositionStream {
        self.position_stream.clone()
    }

    pub fn activation_gate(&self) -> Arc<ActivationGate> {
        Arc::clone(&self.activation_gate)
    }

    pub fn notification_bridge(&self) -> Arc<NotificationBridge> {
        Arc::clone(&self.notification_bridge)
    }

    pub fn console(&self) -> Arc<ConsoleReporter> {
        Arc::clone(&self.console)
    }

    pub fn is_visible(&self) -> bool {
        self.sensors.is_visible()
    }

    /// Show or hide the presentation, starting or stopping both channels
    pub async fn set_visible(&self, visible: bool) {
        self.sensors.set_visible(visible).await;
    }

    /// Toggle one sensor channel; returns whether it is listening afterwards
    pub async fn toggle_sensor(&self, kind: SensorKind) -> bool {
        self.sensors.toggle(kind).await
    }

    /// Ask the running loop to shut down
    pub async fn request_shutdown(&self, reason: ShutdownReason) {
        if let Some(sender) = self.shutdown_sender.lock().await.take() {
            let _ = sender.send(reason);
        }
    }
}
