use chrono::{DateTime, Utc};

/// Notification bridge statistics
#[derive(Debug, Clone, Default)]
pub struct BridgeStats {
    pub fixes_received: u64,
    pub notices_posted: u64,
    pub post_failures: u64,
    pub starts: u64,
    pub last_post_time: Option<DateTime<Utc>>,
}

impl BridgeStats {
    pub fn record_fix(&mut self) {
        self.fixes_received += 1;
    }

    pub fn record_post(&mut self) {
        self.notices_posted += 1;
        self.last_post_time = Some(Utc::now());
    }

    pub fn record_post_failure(&mut self) {
        self.post_failures += 1;
    }

    pub fn record_start(&mut self) {
        self.starts += 1;
    }

    pub fn post_success_rate(&self) -> f64 {
        let attempts = self.notices_posted + self.post_failures;
        if attempts == 0 {
            0.0
        } else {
            self.notices_posted as f64 / attempts as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_records_time_and_rate() {
        let mut stats = BridgeStats::default();
        assert_eq!(stats.post_success_rate(), 0.0);
        assert!(stats.last_post_time.is_none());

        let before = Utc::now();
        stats.record_post();
        stats.record_post();
        stats.record_post_failure();

        assert!(stats.last_post_time.unwrap() >= before);
        assert!((stats.post_success_rate() - 2.0 / 3.0).abs() < 1e-12);
    }
}
