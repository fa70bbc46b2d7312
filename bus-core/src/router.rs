use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::metrics_consts::{PARTITIONS_ASSIGNED, PARTITIONS_REVOKED};
use crate::registry::PartitionRegistry;
use crate::types::{CommitOutcome, CommitResult, TopicPartition};

/// Group-coordination callbacks delivered by the broker client on its own
/// notification context, concurrently with the poll loop.
///
/// Implementations only read and route; they must never call back into the
/// broker client.
pub trait GroupEventHandler: Send + Sync {
    fn on_partitions_assigned(&self, partitions: &[TopicPartition]);

    fn on_partitions_revoked(&self, partitions: &[TopicPartition]);

    /// Pure observability: log the outcome, never block, never fail.
    fn on_offsets_committed(&self, outcome: CommitOutcome);

    fn on_statistics(&self, stats: &str) {
        debug!(len = stats.len(), "broker statistics received");
    }
}

/// Routes broker group events into the partition registry.
pub struct GroupEventRouter {
    group_id: String,
    registry: Arc<PartitionRegistry>,
}

impl GroupEventRouter {
    pub(crate) fn new(group_id: String, registry: Arc<PartitionRegistry>) -> Self {
        Self { group_id, registry }
    }
}

impl GroupEventHandler for GroupEventRouter {
    fn on_partitions_assigned(&self, partitions: &[TopicPartition]) {
        info!(
            group = %self.group_id,
            count = partitions.len(),
            "partitions assigned"
        );
        for partition in partitions {
            metrics::counter!(PARTITIONS_ASSIGNED, "topic" => partition.topic().to_string())
                .increment(1);
            let processor = self.registry.get_or_create(partition);
            processor.on_partition_assigned(partition);
        }
    }

    fn on_partitions_revoked(&self, partitions: &[TopicPartition]) {
        info!(
            group = %self.group_id,
            count = partitions.len(),
            "partitions revoked"
        );
        for partition in partitions {
            metrics::counter!(PARTITIONS_REVOKED, "topic" => partition.topic().to_string())
                .increment(1);
            match self.registry.get(partition) {
                Some(processor) => processor.on_partition_revoked(),
                None => warn!(
                    group = %self.group_id,
                    %partition,
                    "revocation for a partition with no processor"
                ),
            }
        }
    }

    fn on_offsets_committed(&self, outcome: CommitOutcome) {
        match &outcome.result {
            CommitResult::Success => {
                for offset in &outcome.offsets {
                    debug!(group = %self.group_id, %offset, "offset committed");
                }
            }
            CommitResult::Error(reason) => warn!(
                group = %self.group_id,
                offsets = ?outcome.offsets,
                reason,
                "offset commit failed"
            ),
            CommitResult::Fatal(reason) => warn!(
                group = %self.group_id,
                offsets = ?outcome.offsets,
                reason,
                "offset commit failed fatally"
            ),
        }
    }
}
