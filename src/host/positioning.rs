use crate::config::SimulationConfig;
use crate::error::PositionError;
use crate::position::{FixSink, LocationFix, LocationRequest, PositioningProvider};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task::JoinHandle;
use tracing::{debug, info};

const METERS_PER_DEGREE: f64 = 111_320.0;

struct ActiveRequest {
    request: LocationRequest,
    sink: FixSink,
    generator: Option<JoinHandle<()>>,
}

/// Simulated positioning receiver.
///
/// In manual mode batches are injected with [`SimulatedPositioning::push_batch`].
/// In auto mode each registration spawns a generator walking a slow circle
/// around the origin, emitting one batch per request interval.
pub struct SimulatedPositioning {
    origin: (f64, f64),
    auto_emit: bool,
    fail_registration: bool,
    active: Mutex<Option<ActiveRequest>>,
    register_calls: AtomicUsize,
    deregister_calls: AtomicUsize,
}

impl SimulatedPositioning {
    pub fn new(origin_latitude: f64, origin_longitude: f64) -> Self {
        Self {
            origin: (origin_latitude, origin_longitude),
            auto_emit: false,
            fail_registration: false,
            active: Mutex::new(None),
            register_calls: AtomicUsize::new(0),
            deregister_calls: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.origin_latitude, config.origin_longitude).with_auto_emit()
    }

    pub fn with_auto_emit(mut self) -> Self {
        self.auto_emit = true;
        self
    }

    pub fn with_failing_registration(mut self) -> Self {
        self.fail_registration = true;
        self
    }

    /// Deliver a batch through the current registration, if any
    pub fn push_batch(&self, batch: Vec<LocationFix>) -> usize {
        let sink = self.active.lock().as_ref().map(|active| active.sink.clone());
        sink.map(|sink| sink.deliver_batch(batch)).unwrap_or(0)
    }

    pub fn is_registered(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn register_count(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn deregister_count(&self) -> usize {
        self.deregister_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<LocationRequest> {
        self.active.lock().as_ref().map(|active| active.request)
    }

    fn spawn_generator(&self, request: LocationRequest, sink: FixSink) -> Option<JoinHandle<()>> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let origin = self.origin;

        Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(request.interval);
            let mut step: u64 = 0;

            loop {
                ticker.tick().await;
                if !sink.is_live() {
                    break;
                }

                // Every third tick reports a batch of two, newest last
                let mut batch = Vec::with_capacity(2);
                if step % 3 == 2 {
                    batch.push(simulated_fix(origin, step.saturating_sub(1)));
                }
                batch.push(simulated_fix(origin, step));
                sink.deliver_batch(batch);

                step = step.wrapping_add(1);
            }
        }))
    }
}

/// Point on a 50 m circle around the origin, 10 degrees further per step
fn simulated_fix(origin: (f64, f64), step: u64) -> LocationFix {
    let angle = (step as f64 * 10.0).to_radians();
    let radius = 50.0;
    let latitude = origin.0 + radius * angle.cos() / METERS_PER_DEGREE;
    let longitude =
        origin.1 + radius * angle.sin() / (METERS_PER_DEGREE * origin.0.to_radians().cos().max(0.01));
    let bearing = (step as f64 * 10.0 + 90.0) % 360.0;

    LocationFix::new(latitude, longitude, "gps", Utc::now())
        .with_accuracy(4.0 + (step % 4) as f64)
        .with_altitude(120.0)
        .with_speed(1.4)
        .with_bearing(bearing)
}

impl PositioningProvider for SimulatedPositioning {
    fn register(&self, request: LocationRequest, sink: FixSink) -> Result<(), PositionError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_registration {
            return Err(PositionError::RegistrationFailed {
                details: "simulated receiver unavailable".to_string(),
            });
        }

        let generator = if self.auto_emit {
            self.spawn_generator(request, sink.clone())
        } else {
            None
        };

        let previous = self.active.lock().replace(ActiveRequest {
            request,
            sink,
            generator,
        });
        if let Some(generator) = previous.and_then(|previous| previous.generator) {
            generator.abort();
        }

        info!("Simulated receiver registered ({:?} interval)", request.interval);
        Ok(())
    }

    fn deregister(&self) {
        self.deregister_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(active) = self.active.lock().take() {
            if let Some(generator) = active.generator {
                generator.abort();
            }
            debug!("Simulated receiver deregistered");
        }
    }
}
