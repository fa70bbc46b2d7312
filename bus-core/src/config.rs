use std::time::Duration;

use crate::error::ConsumerError;

/// Broker-independent configuration for one consumer group.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    pub group_id: String,
    pub topics: Vec<String>,
    /// How long the poll loop waits before retrying after a transient
    /// consume error.
    pub poll_retry_interval: Duration,
    /// When enabled, every registered partition processor gets an on-close
    /// notification (a last chance to flush and commit) before the broker
    /// session is closed.
    pub commit_on_stop: bool,
}

impl GroupConfig {
    pub fn new(group_id: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            group_id: group_id.into(),
            topics,
            poll_retry_interval: Duration::from_secs(1),
            commit_on_stop: true,
        }
    }

    pub fn with_poll_retry_interval(mut self, interval: Duration) -> Self {
        self.poll_retry_interval = interval;
        self
    }

    pub fn with_commit_on_stop(mut self, enabled: bool) -> Self {
        self.commit_on_stop = enabled;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConsumerError> {
        if self.group_id.trim().is_empty() {
            return Err(ConsumerError::InvalidConfig(
                "group id must not be empty".to_string(),
            ));
        }
        if self.topics.is_empty() {
            return Err(ConsumerError::InvalidConfig(
                "topic set must not be empty".to_string(),
            ));
        }
        if self.topics.iter().any(|topic| topic.trim().is_empty()) {
            return Err(ConsumerError::InvalidConfig(
                "topic names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
