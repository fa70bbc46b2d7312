use std::time::Duration;

use bus_core::GroupConfig;
use envconfig::Envconfig;
use rdkafka::ClientConfig;

/// Environment-derived configuration for one Kafka consumer group.
#[derive(Envconfig, Clone)]
pub struct KafkaConsumerConfig {
    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,

    #[envconfig(default = "false")]
    pub kafka_tls: bool,

    pub kafka_consumer_group: String,

    /// Comma-separated topic list.
    pub kafka_consumer_topic: String,

    // We default to "earliest" for this, but if you're bringing up a new service, you probably want "latest"
    #[envconfig(default = "earliest")]
    pub kafka_consumer_offset_reset: String,

    /// How long the poll loop waits before retrying a transient consume error.
    #[envconfig(default = "1000")]
    pub kafka_poll_retry_interval_ms: u64,

    /// Give partition processors a final flush-and-commit notification on stop.
    #[envconfig(default = "true")]
    pub kafka_commit_on_stop: bool,
}

impl KafkaConsumerConfig {
    /// Because the consumer config is so application specific, we can't set
    /// good defaults in the derive macro, so we expose a way for users to set
    /// them here before init'ing their main config struct.
    pub fn set_defaults(consumer_group: &str, consumer_topic: &str) {
        if std::env::var("KAFKA_CONSUMER_GROUP").is_err() {
            std::env::set_var("KAFKA_CONSUMER_GROUP", consumer_group);
        }
        if std::env::var("KAFKA_CONSUMER_TOPIC").is_err() {
            std::env::set_var("KAFKA_CONSUMER_TOPIC", consumer_topic);
        }
    }

    pub fn topics(&self) -> Vec<String> {
        self.kafka_consumer_topic
            .split(',')
            .map(str::trim)
            .filter(|topic| !topic.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn group_config(&self) -> GroupConfig {
        GroupConfig::new(self.kafka_consumer_group.clone(), self.topics())
            .with_poll_retry_interval(Duration::from_millis(self.kafka_poll_retry_interval_ms))
            .with_commit_on_stop(self.kafka_commit_on_stop)
    }
}

/// Kafka consumer configuration builder with group-consumer defaults.
///
/// The group owns commit timing, so auto commit and auto offset store are
/// disabled, and partition EOF notifications are enabled so processors can
/// observe backfill-complete conditions.
pub struct ConsumerConfigBuilder {
    config: ClientConfig,
}

impl ConsumerConfigBuilder {
    pub fn new(bootstrap_servers: &str, group_id: &str) -> Self {
        let mut config = ClientConfig::new();

        config
            .set("bootstrap.servers", bootstrap_servers)
            .set("group.id", group_id);

        // Group-consumer defaults
        config
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "true")
            .set("statistics.interval.ms", "10000")
            .set("socket.timeout.ms", "10000")
            .set("session.timeout.ms", "60000")
            .set("heartbeat.interval.ms", "5000")
            .set("max.poll.interval.ms", "300000");

        Self { config }
    }

    /// Enable TLS/SSL for the Kafka connection
    pub fn with_tls(mut self, enabled: bool) -> Self {
        if enabled {
            self.config
                .set("security.protocol", "ssl")
                .set("enable.ssl.certificate.verification", "false");
        }
        self
    }

    /// Override offset reset policy
    pub fn with_offset_reset(mut self, policy: &str) -> Self {
        self.config.set("auto.offset.reset", policy);
        self
    }

    /// Add any custom configuration
    pub fn set(mut self, key: &str, value: &str) -> Self {
        self.config.set(key, value);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn builder_sets_manual_commit_and_partition_eof() {
        let config = ConsumerConfigBuilder::new("localhost:9092", "orders-group").build();
        assert_eq!(config.get("bootstrap.servers"), Some("localhost:9092"));
        assert_eq!(config.get("group.id"), Some("orders-group"));
        assert_eq!(config.get("enable.auto.commit"), Some("false"));
        assert_eq!(config.get("enable.auto.offset.store"), Some("false"));
        assert_eq!(config.get("enable.partition.eof"), Some("true"));
    }

    #[test]
    fn builder_tls_and_overrides() {
        let config = ConsumerConfigBuilder::new("localhost:9092", "orders-group")
            .with_tls(true)
            .with_offset_reset("latest")
            .set("fetch.min.bytes", "1024")
            .build();
        assert_eq!(config.get("security.protocol"), Some("ssl"));
        assert_eq!(config.get("auto.offset.reset"), Some("latest"));
        assert_eq!(config.get("fetch.min.bytes"), Some("1024"));
    }

    #[test]
    fn topics_are_split_and_trimmed() {
        let mut env = HashMap::new();
        env.insert("KAFKA_CONSUMER_GROUP".to_string(), "orders-group".to_string());
        env.insert(
            "KAFKA_CONSUMER_TOPIC".to_string(),
            "orders, returns ,".to_string(),
        );
        let config = KafkaConsumerConfig::init_from_hashmap(&env).unwrap();
        assert_eq!(config.topics(), vec!["orders", "returns"]);
    }

    #[test]
    fn group_config_mapping() {
        let mut env = HashMap::new();
        env.insert("KAFKA_CONSUMER_GROUP".to_string(), "orders-group".to_string());
        env.insert("KAFKA_CONSUMER_TOPIC".to_string(), "orders".to_string());
        env.insert("KAFKA_POLL_RETRY_INTERVAL_MS".to_string(), "250".to_string());
        env.insert("KAFKA_COMMIT_ON_STOP".to_string(), "false".to_string());
        let config = KafkaConsumerConfig::init_from_hashmap(&env).unwrap();

        let group = config.group_config();
        assert_eq!(group.group_id, "orders-group");
        assert_eq!(group.topics, vec!["orders"]);
        assert_eq!(group.poll_retry_interval, Duration::from_millis(250));
        assert!(!group.commit_on_stop);
    }
}
