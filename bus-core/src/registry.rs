use std::sync::{Arc, RwLock, RwLockReadGuard};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::commit::CommitController;
use crate::metrics_consts::PROCESSORS_CREATED;
use crate::processor::{PartitionProcessor, ProcessorFactory};
use crate::types::TopicPartition;

type ProcessorMap = DashMap<TopicPartition, Arc<dyn PartitionProcessor>>;

/// Lazily-populated map from partition identity to its processor.
///
/// The registry is the only structure mutated from both the poll loop and the
/// broker's callback context. Per-key access goes through the map's sharded
/// locking under a shared read guard; the write guard is taken only by
/// [`drain`](Self::drain), which swaps the whole map out in one step. A
/// partition maps to at most one processor for the registry's lifetime:
/// concurrent first access for the same key constructs exactly one instance.
pub struct PartitionRegistry {
    processors: RwLock<ProcessorMap>,
    factory: ProcessorFactory,
    commit: Arc<dyn CommitController>,
}

impl PartitionRegistry {
    pub(crate) fn new(factory: ProcessorFactory, commit: Arc<dyn CommitController>) -> Self {
        Self {
            processors: RwLock::new(DashMap::new()),
            factory,
            commit,
        }
    }

    fn map(&self) -> RwLockReadGuard<'_, ProcessorMap> {
        self.processors.read().expect("partition registry lock poisoned")
    }

    /// Look up the processor for a partition, constructing it on first
    /// reference. Construction happens under the key's shard lock, so racing
    /// callers observe the same instance.
    pub fn get_or_create(&self, partition: &TopicPartition) -> Arc<dyn PartitionProcessor> {
        let map = self.map();
        if let Some(existing) = map.get(partition) {
            return existing.clone();
        }
        let processor = map
            .entry(partition.clone())
            .or_insert_with(|| {
                info!(%partition, "creating partition processor");
                metrics::counter!(PROCESSORS_CREATED, "topic" => partition.topic().to_string())
                    .increment(1);
                (self.factory)(partition, self.commit.clone())
            })
            .clone();
        processor
    }

    pub fn get(&self, partition: &TopicPartition) -> Option<Arc<dyn PartitionProcessor>> {
        self.map().get(partition).map(|entry| entry.clone())
    }

    pub fn contains(&self, partition: &TopicPartition) -> bool {
        self.map().contains_key(partition)
    }

    /// Read-only copy of the current processors, used for close
    /// notifications.
    pub fn snapshot(&self) -> Vec<Arc<dyn PartitionProcessor>> {
        self.map().iter().map(|entry| entry.value().clone()).collect()
    }

    /// Remove and return every processor in one atomic step: the whole map is
    /// swapped for an empty one under the write lock, so no processor can be
    /// observed both drained and still registered.
    pub fn drain(&self) -> Vec<Arc<dyn PartitionProcessor>> {
        let taken = std::mem::take(
            &mut *self.processors.write().expect("partition registry lock poisoned"),
        );
        let drained: Vec<_> = taken.into_iter().map(|(_, processor)| processor).collect();
        debug!(count = drained.len(), "drained partition registry");
        drained
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}
