use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::commit::CommitController;
use crate::types::{ConsumedRecord, TopicPartition};

/// Per-partition state machine supplied by the embedding application.
///
/// Guarantees made by the consumer group core:
/// - `on_partition_assigned` is delivered before any record for the
///   partition is routed.
/// - `on_message` calls for one partition are never concurrent with each
///   other; the single-flight poll loop delivers records in broker offset
///   order.
/// - `on_partition_revoked` means the broker has taken the partition away;
///   the registry entry survives, only partition-scoped state should be
///   released. No further records arrive until a fresh assignment.
/// - `on_close` is called at most once per group shutdown, and only when
///   commit-on-stop is enabled.
///
/// The sync callbacks run within the broker client's rebalance callback and
/// must stay fast and non-blocking.
#[async_trait]
pub trait PartitionProcessor: Send + Sync {
    /// The partition was assigned to this group member.
    fn on_partition_assigned(&self, _partition: &TopicPartition) {}

    /// The partition was revoked by a rebalance. Release partition-scoped
    /// state; the processor itself is retained for a later reassignment.
    fn on_partition_revoked(&self) {}

    /// No more records currently available on the partition. `offset` is the
    /// position after the last delivered record. No commit is implied.
    async fn on_partition_eof(&self, _offset: i64) {}

    /// Handle one record. The loop does not poll again until this returns.
    async fn on_message(&self, record: ConsumedRecord) -> Result<()>;

    /// Last chance to flush and commit before the broker session closes.
    async fn on_close(&self) {}
}

/// Creates the processor for a partition on first reference. The commit
/// controller lets the processor request offset commits without touching the
/// broker client.
pub type ProcessorFactory =
    Arc<dyn Fn(&TopicPartition, Arc<dyn CommitController>) -> Arc<dyn PartitionProcessor> + Send + Sync>;
