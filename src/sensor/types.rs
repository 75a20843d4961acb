use crate::error::SensorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

/// One instant of triaxial data from an inertial sensor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample3 {
    pub const ZERO: Sample3 = Sample3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean magnitude of the sample
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Physical inertial source wrapped by a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Accelerometer,
    Gyroscope,
}

impl SensorKind {
    pub fn name(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "Accelerometer",
            SensorKind::Gyroscope => "Gyroscope",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sampling rate requested from the hardware subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SamplingRate {
    #[default]
    Normal,
    Ui,
    Game,
    Fastest,
}

impl SamplingRate {
    /// Nominal delay between samples in milliseconds
    pub fn nominal_delay_ms(&self) -> u64 {
        match self {
            SamplingRate::Normal => 200,
            SamplingRate::Ui => 66,
            SamplingRate::Game => 20,
            SamplingRate::Fastest => 5,
        }
    }
}

/// Handle identifying one hardware registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(pub u64);

/// Callback target handed to the hardware subsystem on registration.
///
/// Samples tagged with another kind are ignored, and once the owning
/// registration is torn down every further delivery is dropped.
#[derive(Clone)]
pub struct SampleSink {
    kind: SensorKind,
    latest: Arc<watch::Sender<Sample3>>,
    live: Arc<AtomicBool>,
}

impl SampleSink {
    pub(crate) fn new(
        kind: SensorKind,
        latest: Arc<watch::Sender<Sample3>>,
        live: Arc<AtomicBool>,
    ) -> Self {
        Self { kind, latest, live }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Deliver one hardware callback. Returns whether the sample was accepted.
    pub fn deliver(&self, kind: SensorKind, sample: Sample3) -> bool {
        if kind != self.kind || !self.is_live() {
            return false;
        }

        trace!(
            "{} sample: ({:.3}, {:.3}, {:.3})",
            kind,
            sample.x,
            sample.y,
            sample.z
        );
        self.latest.send_replace(sample);
        true
    }
}

/// Inertial hardware subsystem as seen by a sensor channel
pub trait InertialHardware: Send + Sync {
    /// Whether a source of this kind exists on the device
    fn has_sensor(&self, kind: SensorKind) -> bool;

    /// Begin delivering samples for `kind` into `sink`
    fn register(
        &self,
        kind: SensorKind,
        rate: SamplingRate,
        sink: SampleSink,
    ) -> Result<RegistrationId, SensorError>;

    /// Stop a registration made by `register`
    fn deregister(&self, registration: RegistrationId);
}
