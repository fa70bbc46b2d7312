use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage, Headers};
use rdkafka::{ClientConfig, Message, Offset, TopicPartitionList};
use tracing::info;

use bus_core::{
    BrokerClient, BrokerError, ConsumedRecord, ConsumerError, GroupEventHandler, Polled,
    TopicPartition, TopicPartitionOffset,
};

use crate::context::GroupConsumerContext;

/// One Kafka consumer-group session, driven exclusively from the group's
/// poll-loop task.
///
/// librdkafka's end-of-partition signal carries only the partition index, so
/// the client records the position after each delivered record per index and
/// uses it to reconstruct the EOF topic and offset. With several topics
/// sharing a partition index the hint tracks whichever topic delivered last;
/// single-topic groups are exact.
pub struct KafkaBrokerClient {
    group_id: String,
    consumer: Mutex<Option<Arc<StreamConsumer<GroupConsumerContext>>>>,
    eof_positions: DashMap<i32, TopicPartitionOffset>,
}

impl KafkaBrokerClient {
    pub fn from_config(
        config: &ClientConfig,
        handler: Arc<dyn GroupEventHandler>,
        group_id: String,
    ) -> Result<Self, ConsumerError> {
        let context = GroupConsumerContext::new(handler);
        let consumer: StreamConsumer<GroupConsumerContext> = config
            .create_with_context(context)
            .map_err(|e| ConsumerError::Broker(BrokerError::Fatal(e.to_string())))?;

        Ok(Self {
            group_id,
            consumer: Mutex::new(Some(Arc::new(consumer))),
            eof_positions: DashMap::new(),
        })
    }

    fn session(&self) -> Result<Arc<StreamConsumer<GroupConsumerContext>>, BrokerError> {
        self.consumer
            .lock()
            .expect("consumer session lock poisoned")
            .clone()
            .ok_or_else(|| BrokerError::Fatal("broker client session is closed".to_string()))
    }
}

fn map_kafka_error(error: KafkaError) -> BrokerError {
    // librdkafka marks unrecoverable conditions with the fatal code;
    // everything else is worth retrying.
    match error.rdkafka_error_code() {
        Some(RDKafkaErrorCode::Fatal) => BrokerError::Fatal(error.to_string()),
        _ => BrokerError::Transient(error.to_string()),
    }
}

fn to_consumed_record(message: &BorrowedMessage<'_>) -> ConsumedRecord {
    let offset = TopicPartitionOffset::new(
        TopicPartition::new(message.topic().to_string(), message.partition()),
        message.offset(),
    );
    let headers = message
        .headers()
        .map(|headers| {
            headers
                .iter()
                .map(|header| (header.key.to_string(), header.value.map(<[u8]>::to_vec)))
                .collect()
        })
        .unwrap_or_default();
    ConsumedRecord::new(
        offset,
        message.key().map(<[u8]>::to_vec),
        message.payload().map(<[u8]>::to_vec),
        headers,
    )
}

#[async_trait]
impl BrokerClient for KafkaBrokerClient {
    async fn subscribe(&self, topics: &[String]) -> Result<(), BrokerError> {
        let session = self.session()?;
        let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        session.subscribe(&topic_refs).map_err(map_kafka_error)
    }

    fn unsubscribe(&self) {
        if let Ok(session) = self.session() {
            session.unsubscribe();
        }
    }

    async fn poll(&self) -> Result<Polled, BrokerError> {
        let session = self.session()?;
        match session.recv().await {
            Ok(message) => {
                let record = to_consumed_record(&message);
                self.eof_positions.insert(
                    record.partition().partition_number(),
                    TopicPartitionOffset::new(
                        record.partition().clone(),
                        record.offset().offset() + 1,
                    ),
                );
                Ok(Polled::Record(record))
            }
            Err(KafkaError::PartitionEOF(partition_number)) => {
                match self.eof_positions.get(&partition_number) {
                    Some(position) => Ok(Polled::PartitionEof(position.clone())),
                    None => Err(BrokerError::Transient(format!(
                        "end of partition {partition_number} before any record was delivered"
                    ))),
                }
            }
            Err(e) => Err(map_kafka_error(e)),
        }
    }

    fn commit(&self, offset: &TopicPartitionOffset) -> Result<(), BrokerError> {
        let session = self.session()?;
        let mut list = TopicPartitionList::new();
        list.add_partition_offset(
            offset.topic(),
            offset.partition_number(),
            Offset::Offset(offset.offset() + 1),
        )
        .map_err(map_kafka_error)?;
        session
            .commit(&list, CommitMode::Async)
            .map_err(map_kafka_error)
    }

    fn close(&self) {
        let taken = self
            .consumer
            .lock()
            .expect("consumer session lock poisoned")
            .take();
        if let Some(session) = taken {
            info!(group = %self.group_id, "closing broker client session");
            // Dropping the consumer runs librdkafka's leave-group handshake.
            drop(session);
        }
    }
}
