use crate::error::Result;
use crate::events::{EventBus, TelemetryEvent};
use crate::sensor::SensorKind;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::Handle;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Single-key commands read from the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    ToggleSensor(SensorKind),
    ToggleVisibility,
    Quit,
}

impl KeyCommand {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('a') | KeyCode::Char('A') => {
                Some(KeyCommand::ToggleSensor(SensorKind::Accelerometer))
            }
            KeyCode::Char('g') | KeyCode::Char('G') => {
                Some(KeyCommand::ToggleSensor(SensorKind::Gyroscope))
            }
            KeyCode::Char('v') | KeyCode::Char('V') => Some(KeyCommand::ToggleVisibility),
            KeyCode::Char('q') | KeyCode::Esc => Some(KeyCommand::Quit),
            _ => None,
        }
    }

    /// Event published for this command; `visible` is the current presentation state
    fn to_event(self, visible: bool) -> TelemetryEvent {
        match self {
            KeyCommand::ToggleSensor(kind) => TelemetryEvent::ToggleSensorRequested { kind },
            KeyCommand::ToggleVisibility => TelemetryEvent::VisibilityRequested { visible: !visible },
            KeyCommand::Quit => TelemetryEvent::ShutdownRequested {
                timestamp: SystemTime::now(),
                reason: "User requested via keyboard".to_string(),
            },
        }
    }
}

/// Keyboard input handler driving the sensor and visibility commands
pub struct KeyboardInputHandler {
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    /// Create a new keyboard input handler
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub async fn start(&self) -> Result<()> {
        info!("Starting keyboard input handler - a/g toggle sensors, v toggles visibility, q quits");

        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();
        let runtime_handle = Handle::current();

        task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            debug!("Raw mode enabled - keyboard handler active");
            let mut visible = true;

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        // Only handle key press events (not release)
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        let Some(command) = KeyCommand::from_key(key_event.code) else {
                            debug!("Key pressed: {:?}", key_event.code);
                            continue;
                        };

                        info!("Keyboard command: {:?}", command);
                        let event = command.to_event(visible);
                        if command == KeyCommand::ToggleVisibility {
                            visible = !visible;
                        }

                        let event_bus = Arc::clone(&event_bus);
                        runtime_handle.spawn(async move {
                            if let Err(e) = event_bus.publish(event).await {
                                warn!("Failed to publish keyboard command: {}", e);
                            }
                        });

                        if command == KeyCommand::Quit {
                            break;
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            } else {
                debug!("Raw mode disabled");
            }

            debug!("Keyboard input handler task exited");
        });

        Ok(())
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the task a moment to clean up and disable raw mode
        tokio::time::sleep(Duration::from_millis(200)).await;

        let _ = disable_raw_mode();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(
            KeyCommand::from_key(KeyCode::Char('a')),
            Some(KeyCommand::ToggleSensor(SensorKind::Accelerometer))
        );
        assert_eq!(
            KeyCommand::from_key(KeyCode::Char('G')),
            Some(KeyCommand::ToggleSensor(SensorKind::Gyroscope))
        );
        assert_eq!(
            KeyCommand::from_key(KeyCode::Char('v')),
            Some(KeyCommand::ToggleVisibility)
        );
        assert_eq!(KeyCommand::from_key(KeyCode::Esc), Some(KeyCommand::Quit));
        assert_eq!(KeyCommand::from_key(KeyCode::Char(' ')), None);
    }

    #[test]
    fn test_command_events() {
        assert_eq!(
            KeyCommand::ToggleVisibility.to_event(true).event_type(),
            "visibility_requested"
        );
        assert!(matches!(
            KeyCommand::ToggleVisibility.to_event(true),
            TelemetryEvent::VisibilityRequested { visible: false }
        ));
        assert_eq!(
            KeyCommand::Quit.to_event(true).event_type(),
            "shutdown_requested"
        );
    }

    #[tokio::test]
    async fn test_keyboard_handler_stop() {
        let event_bus = Arc::new(EventBus::new(100));
        let handler = KeyboardInputHandler::new(event_bus);

        handler.stop().await.unwrap();
        assert!(handler.cancellation_token.is_cancelled());
    }
}
