mod bridge;
mod notice;
mod stats;


pub use bridge::NotificationBridge;
pub use notice::{Notice, NoticeChannelConfig, NoticeImportance, NoticeSink, STARTING_BODY};
pub use stats::BridgeStats;
