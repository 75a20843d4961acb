use crate::config::SimulationConfig;
use crate::error::SensorError;
use crate::sensor::{InertialHardware, RegistrationId, Sample3, SampleSink, SamplingRate, SensorKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

struct Listener {
    sink: SampleSink,
    generator: Option<JoinHandle<()>>,
}

/// Simulated inertial hardware.
///
/// Without a sample interval nothing is generated and samples are injected
/// through [`SimulatedInertialHardware::emit`]. With one, each registration
/// spawns a generator producing a gentle synthetic motion pattern.
pub struct SimulatedInertialHardware {
    accelerometer_present: bool,
    gyroscope_present: bool,
    sample_interval: Option<Duration>,
    fail_registration: bool,
    listeners: Mutex<HashMap<RegistrationId, Listener>>,
    next_id: AtomicU64,
    register_calls: AtomicUsize,
    deregister_calls: AtomicUsize,
}

impl SimulatedInertialHardware {
    pub fn new(accelerometer_present: bool, gyroscope_present: bool) -> Self {
        Self {
            accelerometer_present,
            gyroscope_present,
            sample_interval: None,
            fail_registration: false,
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            register_calls: AtomicUsize::new(0),
            deregister_calls: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.accelerometer_present, config.gyroscope_present)
            .with_sample_interval(Duration::from_millis(config.sample_interval_ms))
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = Some(interval);
        self
    }

    /// Make every registration attempt fail
    pub fn with_failing_registration(mut self) -> Self {
        self.fail_registration = true;
        self
    }

    /// Deliver a sample to every registered listener, as the platform does
    /// for a shared listener object. Returns how many listeners accepted it.
    pub fn emit(&self, kind: SensorKind, sample: Sample3) -> usize {
        let listeners = self.listeners.lock();
        listeners
            .values()
            .filter(|listener| listener.sink.deliver(kind, sample))
            .count()
    }

    pub fn register_count(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn deregister_count(&self) -> usize {
        self.deregister_calls.load(Ordering::SeqCst)
    }

    pub fn active_listeners(&self) -> usize {
        self.listeners.lock().len()
    }

    fn present(&self, kind: SensorKind) -> bool {
        match kind {
            SensorKind::Accelerometer => self.accelerometer_present,
            SensorKind::Gyroscope => self.gyroscope_present,
        }
    }

    fn spawn_generator(kind: SensorKind, interval: Duration, sink: SampleSink) -> Option<JoinHandle<()>> {
        let handle = tokio::runtime::Handle::try_current().ok()?;

        Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut step: u64 = 0;

            loop {
                ticker.tick().await;
                if !sink.is_live() {
                    break;
                }
                sink.deliver(kind, synthetic_sample(kind, step));
                step = step.wrapping_add(1);
            }
        }))
    }
}

/// Slow wobble around rest: gravity on z for the accelerometer, a small
/// rotation for the gyroscope, with a larger burst every 50 steps.
fn synthetic_sample(kind: SensorKind, step: u64) -> Sample3 {
    let phase = step as f64 * 0.2;
    let burst = if step % 50 < 5 { 2.5 } else { 1.0 };

    match kind {
        SensorKind::Accelerometer => Sample3::new(
            0.4 * burst * phase.sin(),
            0.3 * burst * phase.cos(),
            9.8 + 0.2 * burst * (phase * 0.5).sin(),
        ),
        SensorKind::Gyroscope => Sample3::new(
            0.25 * burst * phase.cos(),
            0.15 * burst * phase.sin(),
            0.1 * burst * (phase * 0.3).cos(),
        ),
    }
}

impl InertialHardware for SimulatedInertialHardware {
    fn has_sensor(&self, kind: SensorKind) -> bool {
        self.present(kind)
    }

    fn register(
        &self,
        kind: SensorKind,
        rate: SamplingRate,
        sink: SampleSink,
    ) -> Result<RegistrationId, SensorError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);

        if !self.present(kind) {
            return Err(SensorError::RegistrationFailed {
                kind,
                details: "no such sensor".to_string(),
            });
        }
        if self.fail_registration {
            return Err(SensorError::RegistrationFailed {
                kind,
                details: "simulated registration failure".to_string(),
            });
        }

        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let interval = self
            .sample_interval
            .unwrap_or_else(|| Duration::from_millis(rate.nominal_delay_ms()));
        let generator = if self.sample_interval.is_some() {
            Self::spawn_generator(kind, interval, sink.clone())
        } else {
            None
        };

        self.listeners.lock().insert(id, Listener { sink, generator });
        info!("Simulated {} registered ({:?})", kind, id);

        Ok(id)
    }

    fn deregister(&self, registration: RegistrationId) {
        self.deregister_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(listener) = self.listeners.lock().remove(&registration) {
            if let Some(generator) = listener.generator {
                generator.abort();
            }
            debug!("Simulated {} deregistered ({:?})", listener.sink.kind(), registration);
        }
    }
}
