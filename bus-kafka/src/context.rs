use std::sync::Arc;

use rdkafka::consumer::{BaseConsumer, ConsumerContext, Rebalance};
use rdkafka::error::{KafkaError, KafkaResult, RDKafkaErrorCode};
use rdkafka::topic_partition_list::TopicPartitionList;
use rdkafka::{ClientContext, Offset};
use tracing::{debug, error, warn};

use bus_core::{
    CommitOutcome, CommitResult, GroupEventHandler, TopicPartition, TopicPartitionOffset,
};

/// Routes librdkafka's rebalance, committed-offsets and statistics callbacks
/// into the group's event handler.
///
/// Callbacks run on librdkafka's own threads, concurrently with the poll
/// loop; the handler only reads and routes, so no extra synchronization is
/// needed here.
pub struct GroupConsumerContext {
    handler: Arc<dyn GroupEventHandler>,
}

impl GroupConsumerContext {
    pub fn new(handler: Arc<dyn GroupEventHandler>) -> Self {
        Self { handler }
    }
}

fn to_topic_partitions(list: &TopicPartitionList) -> Vec<TopicPartition> {
    list.elements()
        .into_iter()
        .map(|elem| TopicPartition::new(elem.topic().to_string(), elem.partition()))
        .collect()
}

fn to_committed_offsets(list: &TopicPartitionList) -> Vec<TopicPartitionOffset> {
    list.elements()
        .into_iter()
        .filter_map(|elem| match elem.offset() {
            Offset::Offset(offset) => Some(TopicPartitionOffset::new(
                TopicPartition::new(elem.topic().to_string(), elem.partition()),
                offset,
            )),
            _ => None,
        })
        .collect()
}

pub(crate) fn classify_commit_error(error: &KafkaError) -> CommitResult {
    match error.rdkafka_error_code() {
        Some(RDKafkaErrorCode::Fatal) => CommitResult::Fatal(error.to_string()),
        _ => CommitResult::Error(error.to_string()),
    }
}

impl ClientContext for GroupConsumerContext {
    fn stats_raw(&self, statistics: &[u8]) {
        match std::str::from_utf8(statistics) {
            Ok(json) => self.handler.on_statistics(json),
            Err(e) => warn!(error = %e, "broker statistics payload was not valid utf-8"),
        }
    }
}

impl ConsumerContext for GroupConsumerContext {
    fn pre_rebalance(&self, _base_consumer: &BaseConsumer<Self>, rebalance: &Rebalance) {
        match rebalance {
            Rebalance::Revoke(partitions) => {
                if partitions.count() == 0 {
                    debug!("skipping empty revoke rebalance");
                    return;
                }
                self.handler
                    .on_partitions_revoked(&to_topic_partitions(partitions));
            }
            Rebalance::Assign(partitions) => {
                debug!(count = partitions.count(), "pre-rebalance assign event");
            }
            Rebalance::Error(e) => {
                error!(error = %e, "rebalance error");
            }
        }
    }

    fn post_rebalance(&self, _base_consumer: &BaseConsumer<Self>, rebalance: &Rebalance) {
        match rebalance {
            Rebalance::Assign(partitions) => {
                if partitions.count() == 0 {
                    debug!("skipping empty assign rebalance");
                    return;
                }
                self.handler
                    .on_partitions_assigned(&to_topic_partitions(partitions));
            }
            Rebalance::Revoke(_) => {
                debug!("post-rebalance revoke event");
            }
            Rebalance::Error(e) => {
                error!(error = %e, "post-rebalance error");
            }
        }
    }

    fn commit_callback(&self, result: KafkaResult<()>, offsets: &TopicPartitionList) {
        let outcome = CommitOutcome {
            offsets: to_committed_offsets(offsets),
            result: match result {
                Ok(()) => CommitResult::Success,
                Err(e) => classify_commit_error(&e),
            },
        };
        self.handler.on_offsets_committed(outcome);
    }
}
