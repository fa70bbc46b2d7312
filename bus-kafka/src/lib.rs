//! Kafka binding for the consumer-group coordination core.
//!
//! Wires a [`bus_core::GroupConsumer`] onto an rdkafka `StreamConsumer`:
//! rebalance and committed-offsets callbacks flow through
//! [`GroupConsumerContext`] into the group's event router, and the poll loop
//! drives the session through [`KafkaBrokerClient`].

mod client;
mod config;
mod context;

pub use client::KafkaBrokerClient;
pub use config::{ConsumerConfigBuilder, KafkaConsumerConfig};
pub use context::GroupConsumerContext;

use bus_core::{ConsumerError, GroupConsumer, ProcessorFactory};
use rdkafka::ClientConfig;

/// Assemble a Kafka-backed consumer group from environment-derived
/// configuration. `mutate_client_config` is applied to the broker client
/// configuration after the group defaults, right before the session is
/// created.
pub fn build_group_consumer(
    config: &KafkaConsumerConfig,
    factory: ProcessorFactory,
    mutate_client_config: impl FnOnce(&mut ClientConfig),
) -> Result<GroupConsumer<KafkaBrokerClient>, ConsumerError> {
    let group_config = config.group_config();
    let mut client_config =
        ConsumerConfigBuilder::new(&config.kafka_hosts, &config.kafka_consumer_group)
            .with_tls(config.kafka_tls)
            .with_offset_reset(&config.kafka_consumer_offset_reset)
            .build();
    mutate_client_config(&mut client_config);

    let group_id = group_config.group_id.clone();
    GroupConsumer::new(group_config, factory, move |handler| {
        KafkaBrokerClient::from_config(&client_config, handler, group_id)
    })
}
