use std::fmt;

/// Identity of a single partition of a topic. Used as the registry key,
/// equality is by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPartition {
    topic: String,
    partition_number: i32,
}

impl TopicPartition {
    pub fn new(topic: String, partition_number: i32) -> Self {
        Self {
            topic,
            partition_number,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition_number(&self) -> i32 {
        self.partition_number
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.topic, self.partition_number)
    }
}

/// A partition plus a position within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPartitionOffset {
    partition: TopicPartition,
    offset: i64,
}

impl TopicPartitionOffset {
    pub fn new(partition: TopicPartition, offset: i64) -> Self {
        Self { partition, offset }
    }

    pub fn partition(&self) -> &TopicPartition {
        &self.partition
    }

    pub fn topic(&self) -> &str {
        self.partition.topic()
    }

    pub fn partition_number(&self) -> i32 {
        self.partition.partition_number()
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}

impl fmt::Display for TopicPartitionOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.partition, self.offset)
    }
}

/// One delivered message, detached from the broker client.
#[derive(Debug, Clone)]
pub struct ConsumedRecord {
    offset: TopicPartitionOffset,
    key: Option<Vec<u8>>,
    payload: Option<Vec<u8>>,
    headers: Vec<(String, Option<Vec<u8>>)>,
}

impl ConsumedRecord {
    pub fn new(
        offset: TopicPartitionOffset,
        key: Option<Vec<u8>>,
        payload: Option<Vec<u8>>,
        headers: Vec<(String, Option<Vec<u8>>)>,
    ) -> Self {
        Self {
            offset,
            key,
            payload,
            headers,
        }
    }

    pub fn offset(&self) -> &TopicPartitionOffset {
        &self.offset
    }

    pub fn partition(&self) -> &TopicPartition {
        self.offset.partition()
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.key.as_deref()
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn headers(&self) -> &[(String, Option<Vec<u8>>)] {
        &self.headers
    }
}

/// Outcome of a single poll against the broker client.
#[derive(Debug, Clone)]
pub enum Polled {
    Record(ConsumedRecord),
    /// No more records currently available on this partition. The offset is
    /// the position after the last delivered record.
    PartitionEof(TopicPartitionOffset),
}

/// Broker-reported classification of a commit attempt.
#[derive(Debug, Clone)]
pub enum CommitResult {
    Success,
    Error(String),
    Fatal(String),
}

impl CommitResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CommitResult::Success)
    }
}

/// Outcome of an async offset commit, delivered via the committed-offsets
/// callback. Consumed for observability only, never gates processing.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub offsets: Vec<TopicPartitionOffset>,
    pub result: CommitResult,
}

/// Observable lifecycle state of a consumer group.
///
/// `Faulted` is published when the poll loop terminates on an error it cannot
/// recover from. The group does not restart itself; owners watch this state
/// to detect a silent stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Created,
    Running,
    Stopped,
    Faulted,
}
