//! Scripted in-memory broker client and recording processors used by the
//! consumer group tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use bus_core::{
    BrokerClient, BrokerError, CommitController, ConsumedRecord, GroupConfig, GroupConsumer,
    GroupEventHandler, GroupState, PartitionProcessor, Polled, ProcessorFactory, TopicPartition,
    TopicPartitionOffset,
};

/// Ordered log of everything observable the consumer did: processor
/// callbacks, broker commits, unsubscribe and close.
#[derive(Default)]
pub struct Timeline {
    events: Mutex<Vec<String>>,
}

impl Timeline {
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| e.as_str() == event)
    }

    pub fn index_of(&self, event: &str) -> Option<usize> {
        self.events.lock().unwrap().iter().position(|e| e.as_str() == event)
    }

    pub fn count_of(&self, event: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == event)
            .count()
    }
}

/// One scripted poll outcome fed to the fake broker.
pub enum FakePoll {
    Record(ConsumedRecord),
    Eof(TopicPartitionOffset),
    Transient(String),
    Fatal(String),
}

pub struct FakeShared {
    polls: tokio::sync::Mutex<mpsc::UnboundedReceiver<FakePoll>>,
    /// When set, the next subscribe call fails fatally with this reason.
    pub subscribe_error: Mutex<Option<String>>,
    pub commits: Mutex<Vec<TopicPartitionOffset>>,
    pub subscribed: Mutex<Vec<String>>,
    pub unsubscribed: AtomicBool,
    pub closed: AtomicBool,
    pub timeline: Arc<Timeline>,
}

pub struct FakeBroker {
    shared: Arc<FakeShared>,
}

#[async_trait]
impl BrokerClient for FakeBroker {
    async fn subscribe(&self, topics: &[String]) -> Result<(), BrokerError> {
        if let Some(reason) = self.shared.subscribe_error.lock().unwrap().take() {
            return Err(BrokerError::Fatal(reason));
        }
        self.shared.subscribed.lock().unwrap().extend_from_slice(topics);
        Ok(())
    }

    fn unsubscribe(&self) {
        self.shared.unsubscribed.store(true, Ordering::SeqCst);
        self.shared.timeline.push("unsubscribe");
    }

    async fn poll(&self) -> Result<Polled, BrokerError> {
        let mut polls = self.shared.polls.lock().await;
        match polls.recv().await {
            Some(FakePoll::Record(record)) => Ok(Polled::Record(record)),
            Some(FakePoll::Eof(position)) => Ok(Polled::PartitionEof(position)),
            Some(FakePoll::Transient(reason)) => Err(BrokerError::Transient(reason)),
            Some(FakePoll::Fatal(reason)) => Err(BrokerError::Fatal(reason)),
            // Script exhausted: block like a real broker with no traffic.
            None => std::future::pending().await,
        }
    }

    fn commit(&self, offset: &TopicPartitionOffset) -> Result<(), BrokerError> {
        self.shared.commits.lock().unwrap().push(offset.clone());
        self.shared.timeline.push(format!("commit {offset}"));
        Ok(())
    }

    fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.timeline.push("client_closed");
    }
}

#[derive(Clone, Default)]
pub struct ProcessorOptions {
    /// Request a commit for this offset right after handling it.
    pub commit_after: Option<i64>,
    /// Request a commit for this offset from on_close.
    pub commit_on_close: Option<i64>,
    /// Simulated per-record handling time.
    pub handle_delay: Duration,
}

pub struct RecordingProcessor {
    partition: TopicPartition,
    commit: Arc<dyn CommitController>,
    timeline: Arc<Timeline>,
    options: ProcessorOptions,
    in_flight: AtomicBool,
    overlap: Arc<AtomicBool>,
}

#[async_trait]
impl PartitionProcessor for RecordingProcessor {
    fn on_partition_assigned(&self, partition: &TopicPartition) {
        self.timeline.push(format!("assigned {partition}"));
    }

    fn on_partition_revoked(&self) {
        self.timeline.push(format!("revoked {}", self.partition));
    }

    async fn on_partition_eof(&self, offset: i64) {
        self.timeline.push(format!("eof {} {offset}", self.partition));
    }

    async fn on_message(&self, record: ConsumedRecord) -> Result<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlap.store(true, Ordering::SeqCst);
        }
        if !self.options.handle_delay.is_zero() {
            tokio::time::sleep(self.options.handle_delay).await;
        }
        let offset = record.offset().offset();
        self.timeline.push(format!("record {} {offset}", self.partition));
        if self.options.commit_after == Some(offset) {
            self.commit.request_commit(record.offset().clone());
        }
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn on_close(&self) {
        self.timeline.push(format!("close {}", self.partition));
        if let Some(offset) = self.options.commit_on_close {
            self.commit.request_commit(TopicPartitionOffset::new(self.partition.clone(), offset));
        }
    }
}

pub struct Harness {
    pub consumer: GroupConsumer<FakeBroker>,
    pub shared: Arc<FakeShared>,
    pub poll_tx: mpsc::UnboundedSender<FakePoll>,
    pub handler: Arc<dyn GroupEventHandler>,
    pub timeline: Arc<Timeline>,
    pub processors_created: Arc<AtomicUsize>,
    pub overlap: Arc<AtomicBool>,
}

pub fn harness(config: GroupConfig, options: ProcessorOptions) -> Harness {
    let timeline = Arc::new(Timeline::default());
    let (poll_tx, poll_rx) = mpsc::unbounded_channel();
    let shared = Arc::new(FakeShared {
        polls: tokio::sync::Mutex::new(poll_rx),
        subscribe_error: Mutex::new(None),
        commits: Mutex::new(Vec::new()),
        subscribed: Mutex::new(Vec::new()),
        unsubscribed: AtomicBool::new(false),
        closed: AtomicBool::new(false),
        timeline: timeline.clone(),
    });

    let processors_created = Arc::new(AtomicUsize::new(0));
    let overlap = Arc::new(AtomicBool::new(false));
    let factory: ProcessorFactory = {
        let timeline = timeline.clone();
        let created = processors_created.clone();
        let overlap = overlap.clone();
        let options = options.clone();
        Arc::new(move |partition, commit| {
            created.fetch_add(1, Ordering::SeqCst);
            Arc::new(RecordingProcessor {
                partition: partition.clone(),
                commit,
                timeline: timeline.clone(),
                options: options.clone(),
                in_flight: AtomicBool::new(false),
                overlap: overlap.clone(),
            })
        })
    };

    let mut handler_slot: Option<Arc<dyn GroupEventHandler>> = None;
    let broker_shared = shared.clone();
    let consumer = GroupConsumer::new(config, factory, |handler| {
        handler_slot = Some(handler);
        Ok(FakeBroker {
            shared: broker_shared,
        })
    })
    .expect("harness config is valid");

    Harness {
        consumer,
        shared,
        poll_tx,
        handler: handler_slot.expect("build_client ran"),
        timeline,
        processors_created,
        overlap,
    }
}

pub fn partition(topic: &str, partition_number: i32) -> TopicPartition {
    TopicPartition::new(topic.to_string(), partition_number)
}

pub fn record(topic: &str, partition_number: i32, offset: i64) -> FakePoll {
    let tpo = TopicPartitionOffset::new(partition(topic, partition_number), offset);
    FakePoll::Record(ConsumedRecord::new(
        tpo,
        Some(format!("key-{offset}").into_bytes()),
        Some(format!("payload-{offset}").into_bytes()),
        vec![],
    ))
}

pub async fn wait_for(timeline: &Timeline, event: &str) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !timeline.contains(event) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    if waited.is_err() {
        panic!(
            "timed out waiting for event {event:?}; timeline = {:?}",
            timeline.snapshot()
        );
    }
}

pub async fn wait_for_state(consumer: &GroupConsumer<FakeBroker>, want: GroupState) {
    let mut state_rx = consumer.watch_state();
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while *state_rx.borrow() != want {
            state_rx.changed().await.expect("state sender alive");
        }
    })
    .await;
    if waited.is_err() {
        panic!("timed out waiting for state {want:?}");
    }
}
