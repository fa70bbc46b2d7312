use async_trait::async_trait;

use crate::error::ConsumerError;
use crate::types::GroupState;

/// Start/stop state machine shared by every bus consumer.
///
/// `start` spawns the consumer's background work and returns once it has been
/// scheduled. `stop` signals cancellation and waits for the drain-and-commit
/// shutdown sequence to finish; no timeout is imposed, so a hung broker close
/// can block it indefinitely. Both fail fast on precondition violations:
/// double start, stop without start, or reuse after stop.
///
/// Consumers are single-use: once stopped, `start` returns
/// [`ConsumerError::Closed`] and the restart path is building a fresh
/// instance. The underlying broker session cannot be revived after its
/// leave-group handshake.
#[async_trait]
pub trait ConsumerLifecycle: Send + Sync {
    fn start(&self) -> Result<(), ConsumerError>;

    async fn stop(&self) -> Result<(), ConsumerError>;

    /// Current lifecycle state, including the faulted terminal state a
    /// silently-stopped loop leaves behind.
    fn state(&self) -> GroupState;
}
