use super::control::SensorControl;
use super::orchestrator::ShutdownSlot;
use super::state::record_component_state;
use super::{ComponentState, ShutdownReason, TelemetryOrchestrator};
use crate::activation::{ActivationGate, ActivationState};
use crate::error::Result;
use crate::events::{EventBus, EventFilter, EventReceiver, TelemetryEvent};
use crate::notification::NotificationBridge;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

impl TelemetryOrchestrator {
    /// Register every component as stopped
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing telemetry components for session {}", self.session_id);

        let mut states = self.component_states.lock().await;
        states.insert("sensors".to_string(), ComponentState::Stopped);
        states.insert("commands".to_string(), ComponentState::Stopped);
        states.insert("activation".to_string(), ComponentState::Stopped);
        states.insert("bridge".to_string(), ComponentState::Stopped);
        if self.console_enabled {
            states.insert("console".to_string(), ComponentState::Stopped);
        }

        // Only register keyboard component if enabled
        if self.keyboard_enabled {
            states.insert("keyboard".to_string(), ComponentState::Stopped);
        }

        drop(states);

        for channel in self.sensors.channels() {
            if !channel.is_available() {
                warn!("{} not present on this device", channel.kind().title());
            }
        }

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start all components
    pub async fn start(&self) -> Result<()> {
        info!("Starting telemetry system");

        // Sensors need no authorization
        self.set_component_state("sensors", ComponentState::Starting)
            .await;
        if self.config.sensors.start_on_launch {
            self.sensors.set_visible(true).await;
        }
        self.set_component_state("sensors", ComponentState::Running)
            .await;

        self.start_command_loop().await;
        self.start_activation().await;

        if self.console_enabled {
            self.set_component_state("console", ComponentState::Starting)
                .await;
            self.console.start().await;
            self.set_component_state("console", ComponentState::Running)
                .await;
        }

        // Start keyboard input handler (only if enabled)
        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                self.set_component_state("keyboard", ComponentState::Starting)
                    .await;

                keyboard_handler.start().await.map_err(|e| {
                    error!("Failed to start keyboard handler: {}", e);
                    e
                })?;

                self.set_component_state("keyboard", ComponentState::Running)
                    .await;
            }
        }

        info!("Telemetry system started successfully");
        Ok(())
    }

    async fn start_command_loop(&self) {
        self.set_component_state("commands", ComponentState::Starting)
            .await;

        let receiver = self.event_bus.subscribe_filtered(
            EventFilter::EventTypes(vec![
                "toggle_sensor_requested",
                "visibility_requested",
                "shutdown_requested",
            ]),
            "orchestrator_commands",
        );

        let handle = tokio::spawn(run_command_loop(
            receiver,
            self.sensors.clone(),
            Arc::clone(&self.shutdown_sender),
            self.cancellation_token.clone(),
        ));
        self.tasks.lock().await.push(("commands", handle));

        self.set_component_state("commands", ComponentState::Running)
            .await;
    }

    async fn start_activation(&self) {
        self.set_component_state("activation", ComponentState::Running)
            .await;

        let (activated_sender, activated_receiver) = oneshot::channel();
        self.activation_gate.on_activated(move || {
            let _ = activated_sender.send(());
        });

        let task = ActivationTask {
            gate: Arc::clone(&self.activation_gate),
            bridge: Arc::clone(&self.notification_bridge),
            event_bus: Arc::clone(&self.event_bus),
            component_states: Arc::clone(&self.component_states),
            notify_on_background_denial: self.config.activation.notify_on_background_denial,
            cancellation_token: self.cancellation_token.clone(),
        };

        let handle = tokio::spawn(task.run(activated_receiver));
        self.tasks.lock().await.push(("activation", handle));
    }
}

struct ActivationTask {
    gate: Arc<ActivationGate>,
    bridge: Arc<NotificationBridge>,
    event_bus: Arc<EventBus>,
    component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    notify_on_background_denial: bool,
    cancellation_token: CancellationToken,
}

impl ActivationTask {
    async fn run(self, mut activated: oneshot::Receiver<()>) {
        let state = tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => {
                debug!("Activation sequence abandoned during shutdown");
                return;
            }
            state = self.gate.run() => state,
        };

        record_component_state(&self.component_states, "activation", ComponentState::Stopped)
            .await;
        info!("Activation finished: {}", self.gate.status_message());

        let callback_fired = activated.try_recv().is_ok();
        let start_bridge = callback_fired
            || (state == ActivationState::BackgroundDenied && self.notify_on_background_denial);

        if !start_bridge {
            info!("Background notice not started ({})", state);
            return;
        }

        record_component_state(&self.component_states, "bridge", ComponentState::Starting).await;

        let result = tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => return,
            result = self.bridge.start() => result,
        };

        match result {
            Ok(()) => {
                record_component_state(&self.component_states, "bridge", ComponentState::Running)
                    .await;
            }
            Err(e) => {
                error!("Failed to start notification bridge: {}", e);
                record_component_state(&self.component_states, "bridge", ComponentState::Failed)
                    .await;
                let _ = self
                    .event_bus
                    .publish(TelemetryEvent::SystemError {
                        component: "bridge".to_string(),
                        error: e.to_string(),
                    })
                    .await;
            }
        }
    }
}

async fn run_command_loop(
    mut receiver: EventReceiver,
    sensors: SensorControl,
    shutdown_sender: ShutdownSlot,
    cancellation_token: CancellationToken,
) {
    debug!("Command loop started");

    loop {
        let event = tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => break,
            event = receiver.recv() => event,
        };

        match event {
            Ok(TelemetryEvent::ToggleSensorRequested { kind }) => {
                sensors.toggle(kind).await;
            }
            Ok(TelemetryEvent::VisibilityRequested { visible }) => {
                sensors.set_visible(visible).await;
            }
            Ok(TelemetryEvent::ShutdownRequested { reason, .. }) => {
                if let Some(sender) = shutdown_sender.lock().await.take() {
                    let _ = sender.send(ShutdownReason::UserRequest(reason));
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Command loop stopped: {}", e);
                break;
            }
        }
    }

    debug!("Command loop stopped");
}
