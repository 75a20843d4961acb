use crate::activation::{ActivationGate, ActivationState};
use crate::classifier::{classify_with, MotionThresholds};
use crate::position::{LocationFix, PositionStream, Subscription};
use crate::sensor::{Sample3, SensorChannel, SensorKind};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Output format of the periodic report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// What the console knows about the position stream
#[derive(Debug, Clone, Default)]
pub struct LocationView {
    pub latest: Option<LocationFix>,
    pub updates: u64,
    pub last_update: Option<DateTime<Local>>,
}

impl LocationView {
    pub fn record(&mut self, fix: LocationFix) {
        self.latest = Some(fix);
        self.updates += 1;
        self.last_update = Some(Local::now());
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorSnapshot {
    pub kind: SensorKind,
    pub available: bool,
    pub listening: bool,
    pub sample: Sample3,
    pub intensity: Option<u8>,
    pub label: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub session_id: String,
    pub activation: ActivationState,
    pub status: &'static str,
    pub accelerometer: SensorSnapshot,
    pub gyroscope: SensorSnapshot,
    pub location: Option<LocationFix>,
    pub location_updates: u64,
}

/// Text consumer standing in for the presentation layer.
///
/// Reads both channels and the activation state on every tick and logs a
/// status report. It subscribes to the position stream once the gate
/// permits consumption and releases the subscription on stop.
pub struct ConsoleReporter {
    session_id: String,
    accelerometer: Arc<SensorChannel>,
    gyroscope: Arc<SensorChannel>,
    stream: PositionStream,
    gate: Arc<ActivationGate>,
    thresholds: MotionThresholds,
    interval: Duration,
    format: ReportFormat,
    location: Arc<Mutex<LocationView>>,
    task: tokio::sync::Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl ConsoleReporter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: String,
        accelerometer: Arc<SensorChannel>,
        gyroscope: Arc<SensorChannel>,
        stream: PositionStream,
        gate: Arc<ActivationGate>,
        thresholds: MotionThresholds,
        interval: Duration,
        format: ReportFormat,
    ) -> Self {
        Self {
            session_id,
            accelerometer,
            gyroscope,
            stream,
            gate,
            thresholds,
            interval,
            format,
            location: Arc::new(Mutex::new(LocationView::default())),
            task: tokio::sync::Mutex::new(None),
        }
    }

    pub fn location(&self) -> LocationView {
        self.location.lock().clone()
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let location = self.location.lock().clone();
        StatusSnapshot {
            session_id: self.session_id.clone(),
            activation: self.gate.state(),
            status: self.gate.status_message(),
            accelerometer: sensor_snapshot(&self.accelerometer, &self.thresholds),
            gyroscope: sensor_snapshot(&self.gyroscope, &self.thresholds),
            location: location.latest,
            location_updates: location.updates,
        }
    }

    /// Full multi-line status report
    pub fn render(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "Status: {}", self.gate.status_message());
        report.push_str(&render_sensor(&self.accelerometer, &self.thresholds));
        report.push_str(&render_sensor(&self.gyroscope, &self.thresholds));
        report.push_str(&render_location(self.gate.state(), &self.location.lock()));
        report
    }

    pub async fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return;
        }

        info!("Starting console reporter (every {:?})", self.interval);
        let cancellation_token = CancellationToken::new();
        let reporter = Arc::clone(self);
        let token = cancellation_token.clone();
        let handle = tokio::spawn(async move { reporter.run(token).await });

        *task = Some((cancellation_token, handle));
    }

    pub async fn stop(&self) {
        let Some((cancellation_token, handle)) = self.task.lock().await.take() else {
            return;
        };

        info!("Stopping console reporter");
        cancellation_token.cancel();
        let _ = handle.await;
    }

    async fn run(&self, cancellation_token: CancellationToken) {
        let mut states = self.gate.subscribe();
        let mut subscription: Option<Subscription> = None;
        let mut ticker = tokio::time::interval(self.interval);
        let mut gate_open = true;

        loop {
            if subscription.is_none() && self.gate.state().permits_consumption() {
                match self.stream.subscribe() {
                    Ok(sub) => {
                        debug!("Console subscribed to location updates");
                        subscription = Some(sub);
                    }
                    Err(e) => warn!("Console could not subscribe to location updates: {}", e),
                }
            }

            tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => break,
                changed = states.changed(), if gate_open && subscription.is_none() => {
                    if changed.is_err() {
                        gate_open = false;
                    }
                }
                fix = next_fix(&mut subscription) => match fix {
                    Some(fix) => self.location.lock().record(fix),
                    None => subscription = None,
                },
                _ = ticker.tick() => self.report(),
            }
        }

        drop(subscription);
        debug!("Console reporter stopped");
    }

    fn report(&self) {
        match self.format {
            ReportFormat::Text => info!("\n{}", self.render()),
            ReportFormat::Json => match serde_json::to_string(&self.snapshot()) {
                Ok(json) => info!("{}", json),
                Err(e) => warn!("Failed to serialize status snapshot: {}", e),
            },
        }
    }
}

async fn next_fix(subscription: &mut Option<Subscription>) -> Option<LocationFix> {
    match subscription {
        Some(subscription) => subscription.recv().await,
        None => std::future::pending().await,
    }
}

fn sensor_snapshot(channel: &SensorChannel, thresholds: &MotionThresholds) -> SensorSnapshot {
    let sample = channel.latest();
    let listening = channel.is_listening();
    let classification = listening.then(|| classify_with(sample, channel.kind(), thresholds));

    SensorSnapshot {
        kind: channel.kind(),
        available: channel.is_available(),
        listening,
        sample,
        intensity: classification.as_ref().map(|c| c.intensity),
        label: classification.as_ref().map(|c| c.label),
    }
}

pub fn render_sensor(channel: &SensorChannel, thresholds: &MotionThresholds) -> String {
    let mut out = String::new();
    let kind = channel.kind();
    let _ = writeln!(out, "== {} ==", kind.title());

    if !channel.is_available() {
        out.push_str("  Sensor not available on this device\n");
        return out;
    }
    if !channel.is_listening() {
        out.push_str("  Sensor stopped\n");
        return out;
    }

    let sample = channel.latest();
    let classification = classify_with(sample, kind, thresholds);
    let _ = writeln!(
        out,
        "  X: {:.3}  Y: {:.3}  Z: {:.3}",
        sample.x, sample.y, sample.z
    );

    match kind {
        SensorKind::Accelerometer => {
            let _ = writeln!(out, "  Total Magnitude: {:.3} m/s²", classification.magnitude);
            let _ = writeln!(out, "  Net Acceleration: {:.3} m/s²", classification.net);
            let _ = writeln!(out, "  Dominant Direction: {}", classification.label);
        }
        SensorKind::Gyroscope => {
            let _ = writeln!(out, "  Angular Velocity: {:.3} rad/s", classification.magnitude);
            let _ = writeln!(
                out,
                "  Degrees/sec: {:.1}°/s",
                classification.degrees_per_second()
            );
            let _ = writeln!(out, "  Rotation Axis: {}", classification.label);
        }
    }
    let _ = writeln!(
        out,
        "  Motion: {} ({})",
        classification.intensity_name(),
        classification.intensity
    );
    out
}

pub fn render_location(state: ActivationState, view: &LocationView) -> String {
    let mut out = String::from("== Location ==\n");

    if !state.permits_consumption() {
        out.push_str("  Location permission not granted\n");
        return out;
    }
    let Some(fix) = &view.latest else {
        out.push_str("  Searching for GPS signal...\n");
        return out;
    };

    let _ = writeln!(out, "  Latitude: {:.6}°", fix.latitude);
    let _ = writeln!(out, "  Longitude: {:.6}°", fix.longitude);
    if let Some(accuracy) = fix.accuracy {
        let _ = writeln!(out, "  Accuracy: ±{:.1}m", accuracy);
    }
    if let Some(altitude) = fix.altitude {
        let _ = writeln!(out, "  Altitude: {:.1}m", altitude);
    }
    if let Some(speed) = fix.speed_kmh() {
        let _ = writeln!(out, "  Speed: {:.1} km/h", speed);
    }
    if let (Some(bearing), Some(direction)) = (fix.bearing, fix.compass_direction()) {
        let _ = writeln!(out, "  Direction: {:.1}° ({})", bearing, direction);
    }
    if let Some(last_update) = view.last_update {
        let _ = writeln!(out, "  Last Update: {}", last_update.format("%H:%M:%S"));
    }
    let _ = writeln!(out, "  Updates Received: {}", view.updates);
    let _ = writeln!(out, "  Provider: {}", fix.provider.to_uppercase());
    out
}
