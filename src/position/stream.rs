use super::fix::{LocationFix, LocationRequest};
use crate::config::PositionConfig;
use crate::error::PositionError;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

/// Positioning subsystem as seen by the position stream.
///
/// Implementations deliver batches through the [`FixSink`] from their own
/// execution context; they must not deliver from inside `register`.
pub trait PositioningProvider: Send + Sync {
    fn register(&self, request: LocationRequest, sink: FixSink) -> Result<(), PositionError>;

    fn deregister(&self);
}

/// Callback target handed to the positioning subsystem.
///
/// A sink belongs to one registration; batches arriving through a sink
/// from an earlier registration are discarded.
#[derive(Clone)]
pub struct FixSink {
    inner: Weak<StreamInner>,
    generation: u64,
}

impl FixSink {
    /// Forward the newest fix of a batch to every consumer. Returns the
    /// number of consumers it reached.
    pub fn deliver_batch(&self, batch: Vec<LocationFix>) -> usize {
        let Some(fix) = batch.into_iter().last() else {
            trace!("Empty location batch");
            return 0;
        };
        let Some(inner) = self.inner.upgrade() else {
            return 0;
        };

        inner.deliver(self.generation, fix)
    }

    pub fn is_live(&self) -> bool {
        self.inner
            .upgrade()
            .map(|inner| {
                let state = inner.state.lock();
                state.registered && state.generation == self.generation
            })
            .unwrap_or(false)
    }
}

struct StreamState {
    consumers: HashMap<u64, broadcast::Sender<LocationFix>>,
    next_consumer: u64,
    generation: u64,
    registered: bool,
}

struct StreamInner {
    provider: Arc<dyn PositioningProvider>,
    request: LocationRequest,
    buffer: usize,
    state: Mutex<StreamState>,
}

impl StreamInner {
    fn deliver(&self, generation: u64, fix: LocationFix) -> usize {
        let state = self.state.lock();
        if !state.registered || state.generation != generation {
            debug!("Dropping fix from a stale registration");
            return 0;
        }

        // A full consumer queue evicts its oldest fix, never the new one
        let mut delivered = 0;
        for (id, consumer) in state.consumers.iter() {
            if consumer.len() >= self.buffer {
                warn!("Location consumer {} lagging, oldest fix evicted", id);
            }
            if consumer.send(fix.clone()).is_ok() {
                delivered += 1;
            }
        }

        debug!(
            "Fix ({:.6}, {:.6}) delivered to {} consumer(s)",
            fix.latitude, fix.longitude, delivered
        );
        delivered
    }

    fn unsubscribe(&self, id: u64) {
        let mut state = self.state.lock();
        if state.consumers.remove(&id).is_none() {
            return;
        }
        debug!("Location consumer {} detached", id);

        if state.consumers.is_empty() && state.registered {
            state.registered = false;
            state.generation += 1;
            self.provider.deregister();
            info!("Last location consumer detached, deregistered from positioning");
        }
    }
}

/// Reference-counted push source of location fixes.
///
/// Registration with the positioning subsystem exists only while at least
/// one [`Subscription`] is alive. The 0→1 and 1→0 consumer transitions
/// happen under a single lock together with the register/deregister calls.
#[derive(Clone)]
pub struct PositionStream {
    inner: Arc<StreamInner>,
}

impl PositionStream {
    pub fn new(provider: Arc<dyn PositioningProvider>, request: LocationRequest, buffer: usize) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                provider,
                request,
                buffer: buffer.max(1),
                state: Mutex::new(StreamState {
                    consumers: HashMap::new(),
                    next_consumer: 0,
                    generation: 0,
                    registered: false,
                }),
            }),
        }
    }

    pub fn from_config(provider: Arc<dyn PositioningProvider>, config: &PositionConfig) -> Self {
        let request = LocationRequest {
            interval: Duration::from_millis(config.interval_ms),
            accuracy: config.accuracy,
        };
        Self::new(provider, request, config.subscriber_buffer)
    }

    pub fn request(&self) -> LocationRequest {
        self.inner.request
    }

    /// Attach a consumer, registering with the subsystem if it is the first
    pub fn subscribe(&self) -> Result<Subscription, PositionError> {
        let mut state = self.inner.state.lock();

        if !state.registered {
            let generation = state.generation + 1;
            let sink = FixSink {
                inner: Arc::downgrade(&self.inner),
                generation,
            };
            self.inner.provider.register(self.inner.request, sink)?;

            state.generation = generation;
            state.registered = true;
            info!(
                "Registered for location updates every {:?} ({:?} accuracy)",
                self.inner.request.interval, self.inner.request.accuracy
            );
        }

        let id = state.next_consumer;
        state.next_consumer += 1;

        let (sender, receiver) = broadcast::channel(self.inner.buffer);
        state.consumers.insert(id, sender);
        debug!("Location consumer {} attached ({} total)", id, state.consumers.len());

        Ok(Subscription {
            id,
            receiver,
            stream: Arc::clone(&self.inner),
        })
    }

    pub fn consumer_count(&self) -> usize {
        self.inner.state.lock().consumers.len()
    }

    pub fn is_registered(&self) -> bool {
        self.inner.state.lock().registered
    }
}

/// One consumer's view of a [`PositionStream`]. Dropping it cancels.
pub struct Subscription {
    id: u64,
    receiver: broadcast::Receiver<LocationFix>,
    stream: Arc<StreamInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next fix. After a lag the oldest retained fix comes next.
    pub async fn recv(&mut self) -> Option<LocationFix> {
        loop {
            match self.receiver.recv().await {
                Ok(fix) => return Some(fix),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Location consumer {} skipped {} stale fix(es)", self.id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<LocationFix> {
        loop {
            match self.receiver.try_recv() {
                Ok(fix) => return Some(fix),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!("Location consumer {} skipped {} stale fix(es)", self.id, skipped);
                }
                Err(_) => return None,
            }
        }
    }

    /// Stop deliveries and release this consumer's share of the registration
    pub fn cancel(self) {
        drop(self);
    }

    /// Consume the subscription as a stream of fixes; dropping the stream cancels
    pub fn into_stream(self) -> BoxStream<'static, LocationFix> {
        stream::unfold(self, |mut subscription| async move {
            let fix = subscription.recv().await?;
            Some((fix, subscription))
        })
        .boxed()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stream.unsubscribe(self.id);
    }
}
