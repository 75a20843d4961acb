use crate::activation::ActivationState;
use crate::error::EventBusError;
use crate::sensor::SensorKind;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events that can occur in the telemetry system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TelemetryEvent {
    /// The activation gate moved to a new state
    ActivationChanged {
        state: ActivationState,
        timestamp: SystemTime,
    },
    /// A sensor channel started or stopped listening
    SensorStatusChanged {
        kind: SensorKind,
        listening: bool,
        timestamp: SystemTime,
    },
    /// A consumer asked for a sensor channel to be toggled
    ToggleSensorRequested { kind: SensorKind },
    /// A consumer asked for the presentation to be shown or hidden
    VisibilityRequested { visible: bool },
    /// The presentation surface became visible or hidden
    VisibilityChanged {
        visible: bool,
        timestamp: SystemTime,
    },
    /// The notification bridge received a fix
    FixReceived {
        latitude: f64,
        longitude: f64,
        timestamp: SystemTime,
    },
    /// The background notice was replaced
    NoticePosted { body: String },
    /// The notification bridge started or stopped
    BridgeStatusChanged { running: bool },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested {
        timestamp: SystemTime,
        reason: String,
    },
}

impl TelemetryEvent {
    /// Get the timestamp of the event
    pub fn timestamp(&self) -> SystemTime {
        match self {
            TelemetryEvent::ActivationChanged { timestamp, .. } => *timestamp,
            TelemetryEvent::SensorStatusChanged { timestamp, .. } => *timestamp,
            TelemetryEvent::VisibilityChanged { timestamp, .. } => *timestamp,
            TelemetryEvent::FixReceived { timestamp, .. } => *timestamp,
            TelemetryEvent::ShutdownRequested { timestamp, .. } => *timestamp,
            TelemetryEvent::ToggleSensorRequested { .. }
            | TelemetryEvent::VisibilityRequested { .. }
            | TelemetryEvent::NoticePosted { .. }
            | TelemetryEvent::BridgeStatusChanged { .. }
            | TelemetryEvent::SystemError { .. } => SystemTime::now(),
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            TelemetryEvent::ActivationChanged { state, .. } => {
                format!("Activation state: {}", state)
            }
            TelemetryEvent::SensorStatusChanged {
                kind, listening, ..
            } => {
                format!(
                    "{} {}",
                    kind.title(),
                    if *listening { "listening" } else { "stopped" }
                )
            }
            TelemetryEvent::ToggleSensorRequested { kind } => {
                format!("Toggle requested for {}", kind)
            }
            TelemetryEvent::VisibilityRequested { visible } => {
                format!(
                    "Presentation {} requested",
                    if *visible { "show" } else { "hide" }
                )
            }
            TelemetryEvent::VisibilityChanged { visible, .. } => {
                format!(
                    "Presentation {}",
                    if *visible { "visible" } else { "hidden" }
                )
            }
            TelemetryEvent::FixReceived {
                latitude,
                longitude,
                ..
            } => {
                format!("Fix received: {:.6}, {:.6}", latitude, longitude)
            }
            TelemetryEvent::NoticePosted { body } => format!("Notice posted: {}", body),
            TelemetryEvent::BridgeStatusChanged { running } => {
                format!(
                    "Notification bridge {}",
                    if *running { "running" } else { "stopped" }
                )
            }
            TelemetryEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            TelemetryEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            TelemetryEvent::ActivationChanged { .. } => "activation_changed",
            TelemetryEvent::SensorStatusChanged { .. } => "sensor_status_changed",
            TelemetryEvent::ToggleSensorRequested { .. } => "toggle_sensor_requested",
            TelemetryEvent::VisibilityRequested { .. } => "visibility_requested",
            TelemetryEvent::VisibilityChanged { .. } => "visibility_changed",
            TelemetryEvent::FixReceived { .. } => "fix_received",
            TelemetryEvent::NoticePosted { .. } => "notice_posted",
            TelemetryEvent::BridgeStatusChanged { .. } => "bridge_status_changed",
            TelemetryEvent::SystemError { .. } => "system_error",
            TelemetryEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<TelemetryEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter attached
    pub fn subscribe_filtered<S: Into<String>>(&self, filter: EventFilter, name: S) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.into())
    }

    /// Publish an event to all subscribers
    pub async fn publish(&self, event: TelemetryEvent) -> Result<usize, EventBusError> {
        match &event {
            TelemetryEvent::ActivationChanged { state, .. } => {
                info!("Activation state changed: {}", state);
            }
            TelemetryEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            TelemetryEvent::SensorStatusChanged {
                kind, listening, ..
            } => {
                info!(
                    "{} {}",
                    kind.title(),
                    if *listening { "listening" } else { "stopped" }
                );
            }
            TelemetryEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Accept events from specific components (for SystemError events)
    Components(Vec<String>),
    /// Custom filter function
    Custom(fn(&TelemetryEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &TelemetryEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Components(components) => {
                if let TelemetryEvent::SystemError { component, .. } = event {
                    components.contains(component)
                } else {
                    false
                }
            }
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering capabilities
pub struct EventReceiver {
    receiver: broadcast::Receiver<TelemetryEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<TelemetryEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event.
    ///
    /// Lagging is logged and skipped; only a closed bus ends the stream.
    pub async fn recv(&mut self) -> Result<TelemetryEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<TelemetryEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_event_bus_basic_operations() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let event = TelemetryEvent::ActivationChanged {
            state: ActivationState::Activated,
            timestamp: SystemTime::now(),
        };

        let subscriber_count = event_bus.publish(event).await.unwrap();
        assert_eq!(subscriber_count, 1);

        match receiver.recv().await.unwrap() {
            TelemetryEvent::ActivationChanged { state, .. } => {
                assert_eq!(state, ActivationState::Activated);
            }
            _ => panic!("Unexpected event type"),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_fails() {
        let event_bus = EventBus::new(10);
        let result = event_bus
            .publish(TelemetryEvent::BridgeStatusChanged { running: true })
            .await;
        assert!(matches!(result, Err(EventBusError::PublishFailed { .. })));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let event_bus = EventBus::new(10);
        let mut receiver1 = event_bus.subscribe();
        let mut receiver2 = event_bus.subscribe();
        assert_eq!(event_bus.subscriber_count(), 2);

        event_bus
            .publish(TelemetryEvent::NoticePosted {
                body: "Lat: 1, Lon: 2".to_string(),
            })
            .await
            .unwrap();

        let _ = timeout(Duration::from_millis(100), receiver1.recv())
            .await
            .unwrap()
            .unwrap();
        let _ = timeout(Duration::from_millis(100), receiver2.recv())
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_event_filter() {
        let filter = EventFilter::EventTypes(vec!["activation_changed", "fix_received"]);

        let activation = TelemetryEvent::ActivationChanged {
            state: ActivationState::Unchecked,
            timestamp: SystemTime::now(),
        };
        let toggle = TelemetryEvent::ToggleSensorRequested {
            kind: SensorKind::Gyroscope,
        };

        assert!(filter.matches(&activation));
        assert!(!filter.matches(&toggle));

        let components = EventFilter::Components(vec!["bridge".to_string()]);
        assert!(components.matches(&TelemetryEvent::SystemError {
            component: "bridge".to_string(),
            error: "boom".to_string(),
        }));
        assert!(!components.matches(&toggle));
    }

    #[tokio::test]
    async fn test_filtered_receiver() {
        let event_bus = EventBus::new(10);
        let mut filtered = event_bus.subscribe_filtered(
            EventFilter::EventTypes(vec!["sensor_status_changed"]),
            "test",
        );

        event_bus
            .publish(TelemetryEvent::BridgeStatusChanged { running: true })
            .await
            .unwrap();
        event_bus
            .publish(TelemetryEvent::SensorStatusChanged {
                kind: SensorKind::Accelerometer,
                listening: true,
                timestamp: SystemTime::now(),
            })
            .await
            .unwrap();

        match timeout(Duration::from_millis(100), filtered.recv())
            .await
            .unwrap()
            .unwrap()
        {
            TelemetryEvent::SensorStatusChanged {
                kind, listening, ..
            } => {
                assert_eq!(kind, SensorKind::Accelerometer);
                assert!(listening);
            }
            _ => panic!("Expected SensorStatusChanged event"),
        }
        assert!(filtered.try_recv().unwrap().is_none());
    }

    #[test]
    fn test_event_properties() {
        let event = TelemetryEvent::ShutdownRequested {
            timestamp: SystemTime::now(),
            reason: "SIGINT".to_string(),
        };
        assert_eq!(event.event_type(), "shutdown_requested");
        assert_eq!(event.description(), "Shutdown requested: SIGINT");

        let event = TelemetryEvent::SensorStatusChanged {
            kind: SensorKind::Gyroscope,
            listening: false,
            timestamp: SystemTime::now(),
        };
        assert_eq!(event.description(), "Gyroscope stopped");
    }
}
