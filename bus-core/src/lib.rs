//! Transport-agnostic consumer-group coordination for partitioned log-style
//! message buses.
//!
//! A [`GroupConsumer`] owns one broker session, runs the group's poll loop on
//! a dedicated task, fans records out to per-partition processors held in a
//! [`PartitionRegistry`], and performs manual offset commits marshaled
//! through the loop. Concrete broker bindings implement [`BrokerClient`] and
//! deliver group-coordination callbacks to a [`GroupEventHandler`].

pub mod client;
pub mod commit;
pub mod config;
pub mod consumer;
pub mod error;
pub mod lifecycle;
pub mod metrics_consts;
pub mod processor;
pub mod registry;
pub mod router;
pub mod types;

pub use client::BrokerClient;
pub use commit::CommitController;
pub use config::GroupConfig;
pub use consumer::GroupConsumer;
pub use error::{BrokerError, ConsumerError};
pub use lifecycle::ConsumerLifecycle;
pub use processor::{PartitionProcessor, ProcessorFactory};
pub use registry::PartitionRegistry;
pub use router::{GroupEventHandler, GroupEventRouter};
pub use types::{
    CommitOutcome, CommitResult, ConsumedRecord, GroupState, Polled, TopicPartition,
    TopicPartitionOffset,
};
