use crate::events::{EventBus, TelemetryEvent};
use crate::sensor::{SensorChannel, SensorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::info;

/// Drives both sensor channels on behalf of the presentation lifecycle.
///
/// Hiding the presentation stops every channel; showing it starts every
/// available one. Direct toggles flip one channel.
#[derive(Clone)]
pub struct SensorControl {
    pub(super) accelerometer: Arc<SensorChannel>,
    pub(super) gyroscope: Arc<SensorChannel>,
    event_bus: Arc<EventBus>,
    visible: Arc<AtomicBool>,
}

impl SensorControl {
    pub fn new(
        accelerometer: Arc<SensorChannel>,
        gyroscope: Arc<SensorChannel>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            accelerometer,
            gyroscope,
            event_bus,
            visible: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn channel(&self, kind: SensorKind) -> &Arc<SensorChannel> {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer,
            SensorKind::Gyroscope => &self.gyroscope,
        }
    }

    pub fn channels(&self) -> [&Arc<SensorChannel>; 2] {
        [&self.accelerometer, &self.gyroscope]
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    pub async fn set_visible(&self, visible: bool) {
        let previous = self.visible.swap(visible, Ordering::AcqRel);
        if previous != visible {
            info!(
                "Presentation {}",
                if visible { "visible" } else { "hidden" }
            );
        }

        for channel in self.channels() {
            let was_listening = channel.is_listening();
            if visible {
                channel.start_listening();
            } else {
                channel.stop_listening();
            }
            if channel.is_listening() != was_listening {
                self.publish_status(channel).await;
            }
        }

        let _ = self
            .event_bus
            .publish(TelemetryEvent::VisibilityChanged {
                visible,
                timestamp: SystemTime::now(),
            })
            .await;
    }

    /// Flip one channel; returns whether it is listening afterwards
    pub async fn toggle(&self, kind: SensorKind) -> bool {
        let channel = self.channel(kind);
        let was_listening = channel.is_listening();
        channel.toggle_listening();

        let listening = channel.is_listening();
        if listening != was_listening {
            self.publish_status(channel).await;
        }
        listening
    }

    pub async fn stop_all(&self) {
        for channel in self.channels() {
            if channel.is_listening() {
                channel.stop_listening();
                self.publish_status(channel).await;
            }
        }
    }

    async fn publish_status(&self, channel: &SensorChannel) {
        let _ = self
            .event_bus
            .publish(TelemetryEvent::SensorStatusChanged {
                kind: channel.kind(),
                listening: channel.is_listening(),
                timestamp: SystemTime::now(),
            })
            .await;
    }
}
