use crate::error::NoticeError;
use crate::notification::{Notice, NoticeChannelConfig, NoticeSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Notice host that logs every post and keeps what it displays.
///
/// Overlapping posts are tracked so callers can check that updates are
/// serialized.
pub struct SimulatedNoticeHost {
    channels_supported: bool,
    channels: Mutex<HashMap<String, NoticeChannelConfig>>,
    channel_requests: AtomicUsize,
    posts: Mutex<Vec<Notice>>,
    displayed: Mutex<HashMap<u32, Notice>>,
    post_delay: Duration,
    fail_posts: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl SimulatedNoticeHost {
    pub fn new(channels_supported: bool) -> Self {
        Self {
            channels_supported,
            channels: Mutex::new(HashMap::new()),
            channel_requests: AtomicUsize::new(0),
            posts: Mutex::new(Vec::new()),
            displayed: Mutex::new(HashMap::new()),
            post_delay: Duration::ZERO,
            fail_posts: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_post_delay(mut self, delay: Duration) -> Self {
        self.post_delay = delay;
        self
    }

    pub fn set_fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub fn channel(&self, id: &str) -> Option<NoticeChannelConfig> {
        self.channels.lock().get(id).cloned()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn channel_requests(&self) -> usize {
        self.channel_requests.load(Ordering::SeqCst)
    }

    /// Every accepted post, in order
    pub fn posts(&self) -> Vec<Notice> {
        self.posts.lock().clone()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().len()
    }

    /// Notice currently shown under `id`
    pub fn displayed(&self, id: u32) -> Option<Notice> {
        self.displayed.lock().get(&id).cloned()
    }

    /// Highest number of posts that were ever in progress at once
    pub fn max_concurrent_posts(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NoticeSink for SimulatedNoticeHost {
    async fn create_channel(&self, channel: &NoticeChannelConfig) -> Result<(), NoticeError> {
        self.channel_requests.fetch_add(1, Ordering::SeqCst);

        if !self.channels_supported {
            return Err(NoticeError::ChannelUnsupported);
        }

        let mut channels = self.channels.lock();
        if !channels.contains_key(&channel.id) {
            info!("Created notice channel '{}' ({})", channel.id, channel.name);
            channels.insert(channel.id.clone(), channel.clone());
        }
        Ok(())
    }

    async fn post(&self, notice: &Notice) -> Result<(), NoticeError> {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if !self.post_delay.is_zero() {
            tokio::time::sleep(self.post_delay).await;
        }

        let result = if self.fail_posts.load(Ordering::SeqCst) {
            Err(NoticeError::PostFailed {
                details: "simulated notice host rejected the post".to_string(),
            })
        } else {
            info!("[{}] {}", notice.title, notice.body);
            debug!(
                "Notice {} posted on channel {:?}",
                notice.id, notice.channel_id
            );
            self.posts.lock().push(notice.clone());
            self.displayed.lock().insert(notice.id, notice.clone());
            Ok(())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
