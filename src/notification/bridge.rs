use super::notice::{Notice, NoticeChannelConfig, NoticeSink, STARTING_BODY};
use super::stats::BridgeStats;
use crate::config::NotificationConfig;
use crate::error::{NoticeError, Result};
use crate::events::{EventBus, TelemetryEvent};
use crate::position::{LocationFix, PositionStream, Subscription};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Keeps the position stream visible through one persistent background notice.
///
/// The bridge is a consumer of the [`PositionStream`]: it holds one
/// subscription while running and releases it on [`NotificationBridge::stop`].
/// Fixes are posted by a single task in arrival order, so posts never overlap
/// and the displayed body always ends at the latest fix.
pub struct NotificationBridge {
    stream: PositionStream,
    sink: Arc<dyn NoticeSink>,
    config: NotificationConfig,
    event_bus: Arc<EventBus>,
    /// Channel used for posts, resolved once; `None` after an unsupported setup
    channel: OnceCell<Option<String>>,
    is_running: AtomicBool,
    state: tokio::sync::Mutex<Option<BridgeTask>>,
    stats: Arc<Mutex<BridgeStats>>,
}

struct BridgeTask {
    cancellation_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl NotificationBridge {
    pub fn new(
        stream: PositionStream,
        sink: Arc<dyn NoticeSink>,
        config: NotificationConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            stream,
            sink,
            config,
            event_bus,
            channel: OnceCell::new(),
            is_running: AtomicBool::new(false),
            state: tokio::sync::Mutex::new(None),
            stats: Arc::new(Mutex::new(BridgeStats::default())),
        }
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats.lock().clone()
    }

    /// Channel the notices are posted under, once setup has run
    pub fn channel_id(&self) -> Option<String> {
        self.channel.get().cloned().flatten()
    }

    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.is_some() {
            debug!("Notification bridge is already running");
            return Ok(());
        }

        info!("Starting notification bridge");

        let channel_id = self.ensure_channel().await;
        let template = Notice {
            id: self.config.notice_id,
            channel_id,
            title: self.config.title.clone(),
            body: STARTING_BODY.to_string(),
            ongoing: true,
        };

        let subscription = self.stream.subscribe()?;
        post_notice(self.sink.as_ref(), &template, &self.stats, &self.event_bus).await;

        let cancellation_token = CancellationToken::new();

        let handle = tokio::spawn(run_posting_loop(
            subscription,
            template,
            Arc::clone(&self.sink),
            Arc::clone(&self.stats),
            Arc::clone(&self.event_bus),
            cancellation_token.clone(),
        ));

        *state = Some(BridgeTask {
            cancellation_token,
            handle,
        });
        self.stats.lock().record_start();
        self.is_running.store(true, Ordering::Release);

        let _ = self
            .event_bus
            .publish(TelemetryEvent::BridgeStatusChanged { running: true })
            .await;

        info!("Notification bridge started");
        Ok(())
    }

    /// Stop posting and release the stream subscription.
    ///
    /// Returns once the posting task has finished; nothing is posted after.
    pub async fn stop(&self) -> Result<()> {
        let Some(task) = self.state.lock().await.take() else {
            return Ok(());
        };

        info!("Stopping notification bridge");
        task.cancellation_token.cancel();

        if let Err(e) = task.handle.await {
            error!("Notification bridge task failed: {}", e);
        }

        self.is_running.store(false, Ordering::Release);

        let _ = self
            .event_bus
            .publish(TelemetryEvent::BridgeStatusChanged { running: false })
            .await;

        info!("Notification bridge stopped");
        Ok(())
    }

    async fn ensure_channel(&self) -> Option<String> {
        self.channel
            .get_or_init(|| async {
                let channel = NoticeChannelConfig::silent(
                    self.config.channel_id.as_str(),
                    self.config.channel_name.as_str(),
                );

                match self.sink.create_channel(&channel).await {
                    Ok(()) => {
                        info!("Notice channel '{}' ready", channel.id);
                        Some(channel.id)
                    }
                    Err(NoticeError::ChannelUnsupported) => {
                        info!("Notice channels unsupported, posting without a channel");
                        None
                    }
                    Err(e) => {
                        warn!("Notice channel setup failed, posting without a channel: {}", e);
                        None
                    }
                }
            })
            .await
            .clone()
    }
}

async fn run_posting_loop(
    mut subscription: Subscription,
    template: Notice,
    sink: Arc<dyn NoticeSink>,
    stats: Arc<Mutex<BridgeStats>>,
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
) {
    debug!("Notification posting loop started");

    loop {
        let fix = tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => break,
            fix = subscription.recv() => fix,
        };

        let Some(fix) = fix else {
            warn!("Position stream closed, notification bridge idle");
            break;
        };

        stats.lock().record_fix();
        publish_fix(&event_bus, &fix).await;

        let notice = Notice {
            body: fix.notice_body(),
            ..template.clone()
        };
        post_notice(sink.as_ref(), &notice, &stats, &event_bus).await;
    }

    drop(subscription);
    debug!("Notification posting loop stopped");
}

async fn publish_fix(event_bus: &EventBus, fix: &LocationFix) {
    let _ = event_bus
        .publish(TelemetryEvent::FixReceived {
            latitude: fix.latitude,
            longitude: fix.longitude,
            timestamp: SystemTime::now(),
        })
        .await;
}

async fn post_notice(
    sink: &dyn NoticeSink,
    notice: &Notice,
    stats: &Mutex<BridgeStats>,
    event_bus: &EventBus,
) {
    match sink.post(notice).await {
        Ok(()) => {
            stats.lock().record_post();
            debug!("Notice {} updated: {}", notice.id, notice.body);
            let _ = event_bus
                .publish(TelemetryEvent::NoticePosted {
                    body: notice.body.clone(),
                })
                .await;
        }
        Err(e) => {
            stats.lock().record_post_failure();
            warn!("Failed to post notice {}: {}", notice.id, e);
            let _ = event_bus
                .publish(TelemetryEvent::SystemError {
                    component: "notification_bridge".to_string(),
                    error: e.to_string(),
                })
                .await;
        }
    }
}
