use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::BrokerClient;
use crate::commit::{commit_channel, CommitController, CommitQueue};
use crate::config::GroupConfig;
use crate::error::{BrokerError, ConsumerError};
use crate::lifecycle::ConsumerLifecycle;
use crate::metrics_consts::{
    PARTITION_EOF_EVENTS, PROCESSOR_ERRORS, RECORDS_ROUTED, TRANSIENT_POLL_ERRORS,
};
use crate::processor::ProcessorFactory;
use crate::registry::PartitionRegistry;
use crate::router::{GroupEventHandler, GroupEventRouter};
use crate::types::{ConsumedRecord, GroupState, Polled, TopicPartitionOffset};

struct LoopHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

#[derive(Default)]
struct RunState {
    handle: Option<LoopHandle>,
    closed: bool,
}

/// Owns one broker session for one consumer group and drives its poll loop.
///
/// The loop runs on its own long-running tokio task for the group's entire
/// lifetime. All broker client access (subscribe, poll, commit, unsubscribe,
/// close) happens from that task; commit requests from partition processors
/// are marshaled into it over a channel, and broker callbacks only touch the
/// registry.
pub struct GroupConsumer<C: BrokerClient> {
    config: GroupConfig,
    client: Arc<C>,
    registry: Arc<PartitionRegistry>,
    commit_queue: Arc<CommitQueue>,
    commit_rx: Mutex<Option<mpsc::UnboundedReceiver<TopicPartitionOffset>>>,
    run: Mutex<RunState>,
    state_tx: watch::Sender<GroupState>,
}

impl<C: BrokerClient> GroupConsumer<C> {
    /// Assemble a consumer group. `build_client` receives the group's event
    /// handler so the concrete binding can wire its callback context before
    /// creating the broker session. Fails fast on invalid configuration.
    pub fn new<F>(
        config: GroupConfig,
        factory: ProcessorFactory,
        build_client: F,
    ) -> Result<Self, ConsumerError>
    where
        F: FnOnce(Arc<dyn GroupEventHandler>) -> Result<C, ConsumerError>,
    {
        config.validate()?;

        let (commit_queue, commit_rx) = commit_channel(&config.group_id);
        let registry = Arc::new(PartitionRegistry::new(factory, commit_queue.clone()));
        let router: Arc<dyn GroupEventHandler> = Arc::new(GroupEventRouter::new(
            config.group_id.clone(),
            registry.clone(),
        ));
        let client = Arc::new(build_client(router)?);
        let (state_tx, _) = watch::channel(GroupState::Created);

        Ok(Self {
            config,
            client,
            registry,
            commit_queue,
            commit_rx: Mutex::new(Some(commit_rx)),
            run: Mutex::new(RunState::default()),
            state_tx,
        })
    }

    /// Subscribe to state transitions, including the faulted state published
    /// when the loop terminates on an unrecoverable error.
    pub fn watch_state(&self) -> watch::Receiver<GroupState> {
        self.state_tx.subscribe()
    }

    pub fn group_id(&self) -> &str {
        &self.config.group_id
    }
}

#[async_trait]
impl<C: BrokerClient> ConsumerLifecycle for GroupConsumer<C> {
    fn start(&self) -> Result<(), ConsumerError> {
        let mut run = self.run.lock().expect("consumer run state poisoned");
        if run.handle.is_some() {
            return Err(ConsumerError::AlreadyStarted);
        }
        if run.closed {
            return Err(ConsumerError::Closed);
        }
        let commit_rx = self
            .commit_rx
            .lock()
            .expect("commit receiver state poisoned")
            .take()
            .ok_or(ConsumerError::Closed)?;

        let token = CancellationToken::new();
        let poll_loop = PollLoop {
            config: self.config.clone(),
            client: self.client.clone(),
            registry: self.registry.clone(),
            commit_rx,
            token: token.clone(),
            state_tx: self.state_tx.clone(),
        };
        // Published before the loop can run: a loop that faults immediately
        // must not have its Faulted transition overwritten by Running.
        self.state_tx.send_replace(GroupState::Running);
        let join = tokio::spawn(poll_loop.run());
        run.handle = Some(LoopHandle { token, join });
        info!(group = %self.config.group_id, "consumer group started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), ConsumerError> {
        let handle = {
            let mut run = self.run.lock().expect("consumer run state poisoned");
            let handle = run.handle.take().ok_or(ConsumerError::NotStarted)?;
            run.closed = true;
            handle
        };

        info!(group = %self.config.group_id, "stopping consumer group");
        handle.token.cancel();
        // No shutdown timeout: a hung broker close blocks here, by contract.
        if let Err(join_error) = handle.join.await {
            error!(
                group = %self.config.group_id,
                error = %join_error,
                "consumer group poll loop task failed to join"
            );
        }

        if *self.state_tx.borrow() != GroupState::Faulted {
            self.state_tx.send_replace(GroupState::Stopped);
        }
        info!(group = %self.config.group_id, "consumer group stopped");
        Ok(())
    }

    fn state(&self) -> GroupState {
        *self.state_tx.borrow()
    }
}

impl<C: BrokerClient> CommitController for GroupConsumer<C> {
    fn request_commit(&self, offset: TopicPartitionOffset) {
        self.commit_queue.request_commit(offset);
    }
}

impl<C: BrokerClient> Drop for GroupConsumer<C> {
    fn drop(&mut self) {
        if let Ok(mut run) = self.run.lock() {
            if let Some(handle) = run.handle.take() {
                warn!(
                    group = %self.config.group_id,
                    "consumer group dropped while running, cancelling poll loop"
                );
                handle.token.cancel();
            }
        }
    }
}

/// The state moved onto the dedicated poll-loop task.
struct PollLoop<C: BrokerClient> {
    config: GroupConfig,
    client: Arc<C>,
    registry: Arc<PartitionRegistry>,
    commit_rx: mpsc::UnboundedReceiver<TopicPartitionOffset>,
    token: CancellationToken,
    state_tx: watch::Sender<GroupState>,
}

impl<C: BrokerClient> PollLoop<C> {
    async fn run(mut self) {
        match self.consume().await {
            Ok(()) => {
                info!(group = %self.config.group_id, "consumer group poll loop stopped cleanly");
            }
            Err(e) => {
                // Silent-stop failure mode: the loop is done, the group stays
                // faulted until the owner reacts. No automatic restart.
                error!(
                    group = %self.config.group_id,
                    error = %e,
                    "consumer group poll loop terminated"
                );
                self.state_tx.send_replace(GroupState::Faulted);
            }
        }
    }

    async fn consume(&mut self) -> Result<(), BrokerError> {
        self.client.subscribe(&self.config.topics).await?;
        info!(
            group = %self.config.group_id,
            topics = ?self.config.topics,
            "subscribed to topics"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.token.cancelled() => break,

                Some(offset) = self.commit_rx.recv() => {
                    self.commit(offset);
                }

                polled = self.client.poll() => match polled {
                    Ok(Polled::Record(record)) => self.dispatch_record(record).await,
                    Ok(Polled::PartitionEof(position)) => self.dispatch_eof(position).await,
                    Err(e) if e.is_transient() => {
                        metrics::counter!(TRANSIENT_POLL_ERRORS).increment(1);
                        warn!(
                            group = %self.config.group_id,
                            error = %e,
                            retry_ms = self.config.poll_retry_interval.as_millis() as u64,
                            "transient consume error, retrying"
                        );
                        tokio::select! {
                            _ = self.token.cancelled() => {}
                            _ = tokio::time::sleep(self.config.poll_retry_interval) => {}
                        }
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        debug!(group = %self.config.group_id, "cancellation observed, draining consumer group");
        self.shutdown().await;
        Ok(())
    }

    /// Route one record to its partition processor and wait for handling to
    /// finish before the next poll. Single-flight per group: backpressure is
    /// implicit, at most one unhandled record exists at a time.
    async fn dispatch_record(&self, record: ConsumedRecord) {
        let partition = record.partition().clone();
        let offset = record.offset().offset();
        metrics::counter!(RECORDS_ROUTED, "topic" => partition.topic().to_string()).increment(1);

        let processor = self.registry.get_or_create(&partition);
        if let Err(e) = processor.on_message(record).await {
            metrics::counter!(PROCESSOR_ERRORS, "topic" => partition.topic().to_string())
                .increment(1);
            error!(
                group = %self.config.group_id,
                %partition,
                offset,
                error = %e,
                "partition processor failed to handle record"
            );
        }
    }

    async fn dispatch_eof(&self, position: TopicPartitionOffset) {
        metrics::counter!(PARTITION_EOF_EVENTS, "topic" => position.topic().to_string())
            .increment(1);
        debug!(
            group = %self.config.group_id,
            partition = %position.partition(),
            offset = position.offset(),
            "end of partition reached"
        );
        let processor = self.registry.get_or_create(position.partition());
        processor.on_partition_eof(position.offset()).await;
    }

    fn commit(&self, offset: TopicPartitionOffset) {
        debug!(group = %self.config.group_id, %offset, "committing offset");
        if let Err(e) = self.client.commit(&offset) {
            // Fire-and-forget contract: surfaced via the committed-offsets
            // callback, never escalated to the caller.
            warn!(
                group = %self.config.group_id,
                %offset,
                error = %e,
                "offset commit request failed"
            );
        }
    }

    async fn shutdown(&mut self) {
        self.client.unsubscribe();

        if self.config.commit_on_stop {
            let processors = self.registry.snapshot();
            info!(
                group = %self.config.group_id,
                count = processors.len(),
                "notifying partition processors before close"
            );
            for processor in processors {
                processor.on_close().await;
            }
        }

        // Flush commit requests still queued, including any issued from
        // on_close, before the session goes away.
        while let Ok(offset) = self.commit_rx.try_recv() {
            self.commit(offset);
        }

        self.client.close();
        let drained = self.registry.drain();
        debug!(
            group = %self.config.group_id,
            processors = drained.len(),
            "consumer group torn down"
        );
    }
}
