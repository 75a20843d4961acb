use crate::error::NoticeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Body shown before the first fix arrives
pub const STARTING_BODY: &str = "Starting location service...";

/// One posting of the persistent background notice.
///
/// Posting again under the same `id` replaces the displayed content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u32,
    /// Channel to post under; `None` uses the host's default path
    pub channel_id: Option<String>,
    pub title: String,
    pub body: String,
    /// Not dismissable by the user
    pub ongoing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeImportance {
    Min,
    Low,
    Default,
    High,
}

/// Presentation settings for a notice channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoticeChannelConfig {
    pub id: String,
    pub name: String,
    pub importance: NoticeImportance,
    pub sound: bool,
    pub vibration: bool,
    pub show_badge: bool,
}

impl NoticeChannelConfig {
    /// Low-interruption channel: no sound, vibration or badge
    pub fn silent<S: Into<String>>(id: S, name: S) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            importance: NoticeImportance::Low,
            sound: false,
            vibration: false,
            show_badge: false,
        }
    }
}

/// Host background-notice subsystem
#[async_trait]
pub trait NoticeSink: Send + Sync {
    /// Create the channel, succeeding again if it already exists.
    /// Returns [`NoticeError::ChannelUnsupported`] on hosts without channels.
    async fn create_channel(&self, channel: &NoticeChannelConfig) -> Result<(), NoticeError>;

    /// Display `notice`, replacing any earlier notice with the same id
    async fn post(&self, notice: &Notice) -> Result<(), NoticeError>;
}
