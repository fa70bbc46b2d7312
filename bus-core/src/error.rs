use thiserror::Error;

/// Errors surfaced by the broker client binding.
///
/// Transient errors (broker unreachable, coordinator moving, rebalance races)
/// are retried by the poll loop after the configured interval. Fatal errors
/// terminate the loop and leave the group faulted.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("transient broker error: {0}")]
    Transient(String),
    #[error("fatal broker error: {0}")]
    Fatal(String),
}

impl BrokerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, BrokerError::Transient(_))
    }
}

/// Errors surfaced by the consumer group lifecycle surface.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("consumer group already started")]
    AlreadyStarted,
    #[error("consumer group not started")]
    NotStarted,
    #[error("consumer group already stopped; create a new instance to consume again")]
    Closed,
    #[error("invalid consumer configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}
