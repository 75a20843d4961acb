use super::types::{InertialHardware, RegistrationId, Sample3, SampleSink, SamplingRate, SensorKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

struct ActiveRegistration {
    id: RegistrationId,
    live: Arc<AtomicBool>,
}

/// Live wrapper around one inertial hardware source.
///
/// Holds only the most recent sample; a newer sample always replaces an
/// unconsumed older one. `listening` is only ever true for an available source.
pub struct SensorChannel {
    kind: SensorKind,
    rate: SamplingRate,
    available: bool,
    hardware: Arc<dyn InertialHardware>,
    latest: Arc<watch::Sender<Sample3>>,
    listening: watch::Sender<bool>,
    registration: Mutex<Option<ActiveRegistration>>,
}

impl SensorChannel {
    /// Create a channel, probing the hardware once for the source.
    pub fn new(kind: SensorKind, rate: SamplingRate, hardware: Arc<dyn InertialHardware>) -> Self {
        let available = hardware.has_sensor(kind);
        if available {
            info!("{} channel created", kind);
        } else {
            warn!("{} not available on this device", kind);
        }

        let (latest, _) = watch::channel(Sample3::ZERO);
        let (listening, _) = watch::channel(false);

        Self {
            kind,
            rate,
            available,
            hardware,
            latest: Arc::new(latest),
            listening,
            registration: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn is_listening(&self) -> bool {
        *self.listening.borrow()
    }

    /// Most recent sample, the zero vector until the first delivery
    pub fn latest(&self) -> Sample3 {
        *self.latest.borrow()
    }

    pub fn subscribe_latest(&self) -> watch::Receiver<Sample3> {
        self.latest.subscribe()
    }

    pub fn subscribe_listening(&self) -> watch::Receiver<bool> {
        self.listening.subscribe()
    }

    pub fn start_listening(&self) {
        let mut registration = self.registration.lock();
        self.start_locked(&mut registration);
    }

    pub fn stop_listening(&self) {
        let mut registration = self.registration.lock();
        self.stop_locked(&mut registration);
    }

    pub fn toggle_listening(&self) {
        let mut registration = self.registration.lock();
        if registration.is_some() {
            self.stop_locked(&mut registration);
        } else {
            self.start_locked(&mut registration);
        }
    }

    fn start_locked(&self, registration: &mut Option<ActiveRegistration>) {
        if !self.available {
            debug!("Ignoring start for unavailable {}", self.kind);
            return;
        }
        if registration.is_some() {
            return;
        }

        let live = Arc::new(AtomicBool::new(true));
        let sink = SampleSink::new(self.kind, Arc::clone(&self.latest), Arc::clone(&live));

        match self.hardware.register(self.kind, self.rate, sink) {
            Ok(id) => {
                *registration = Some(ActiveRegistration { id, live });
                self.listening.send_replace(true);
                info!("{} listening at {:?} rate", self.kind, self.rate);
            }
            Err(e) => {
                warn!("{} stays idle: {}", self.kind, e);
            }
        }
    }

    fn stop_locked(&self, registration: &mut Option<ActiveRegistration>) {
        if let Some(active) = registration.take() {
            active.live.store(false, Ordering::Release);
            self.hardware.deregister(active.id);
            self.listening.send_replace(false);
            info!("{} stopped", self.kind);
        }
    }
}

impl Drop for SensorChannel {
    fn drop(&mut self) {
        let registration = self.registration.get_mut();
        if let Some(active) = registration.take() {
            active.live.store(false, Ordering::Release);
            self.hardware.deregister(active.id);
        }
    }
}
