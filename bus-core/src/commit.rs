use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::metrics_consts::COMMIT_REQUESTS;
use crate::types::TopicPartitionOffset;

/// Capability handed to partition processors for requesting offset commits.
///
/// Commit is fire-and-forget: the request is marshaled into the poll loop and
/// executed between polls, so it never races the broker client. Whether a
/// commit actually landed is only knowable via the committed-offsets
/// observability callback.
pub trait CommitController: Send + Sync {
    fn request_commit(&self, offset: TopicPartitionOffset);
}

/// Channel-backed [`CommitController`]. The receiving half lives in the poll
/// loop, which performs the actual broker commit.
pub(crate) struct CommitQueue {
    group_id: String,
    tx: mpsc::UnboundedSender<TopicPartitionOffset>,
}

pub(crate) fn commit_channel(
    group_id: &str,
) -> (Arc<CommitQueue>, mpsc::UnboundedReceiver<TopicPartitionOffset>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let queue = Arc::new(CommitQueue {
        group_id: group_id.to_string(),
        tx,
    });
    (queue, rx)
}

impl CommitController for CommitQueue {
    fn request_commit(&self, offset: TopicPartitionOffset) {
        metrics::counter!(COMMIT_REQUESTS, "topic" => offset.topic().to_string()).increment(1);
        debug!(
            group = %self.group_id,
            topic = offset.topic(),
            partition = offset.partition_number(),
            offset = offset.offset(),
            "commit requested"
        );
        if self.tx.send(offset).is_err() {
            warn!(
                group = %self.group_id,
                "commit requested after the poll loop stopped, request dropped"
            );
        }
    }
}
