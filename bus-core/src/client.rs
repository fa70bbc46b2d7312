use async_trait::async_trait;

use crate::error::BrokerError;
use crate::types::{Polled, TopicPartitionOffset};

/// Abstraction over one partitioned-log broker session owned by a consumer
/// group.
///
/// Every method is driven from the single poll-loop task; implementations do
/// not need to tolerate concurrent calls. Group-coordination callbacks
/// (assignment, revocation, committed offsets, statistics) are delivered out
/// of band, on a context owned by the broker client, to the
/// [`GroupEventHandler`](crate::router::GroupEventHandler) the client was
/// built with.
#[async_trait]
pub trait BrokerClient: Send + Sync + 'static {
    /// Join the group and subscribe to the topic set.
    async fn subscribe(&self, topics: &[String]) -> Result<(), BrokerError>;

    /// Drop all subscriptions. Safe to call on an already-closed session.
    fn unsubscribe(&self);

    /// Wait for the next record or end-of-partition marker. Must be
    /// cancel-safe: the loop awaits it under a cancellation token.
    async fn poll(&self) -> Result<Polled, BrokerError>;

    /// Request an async commit of exactly this offset. Fire-and-forget; the
    /// definitive outcome arrives via the committed-offsets callback.
    fn commit(&self, offset: &TopicPartitionOffset) -> Result<(), BrokerError>;

    /// Close the session, triggering the broker's leave-group handshake.
    fn close(&self);
}
