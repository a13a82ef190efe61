//! Background persistence for snapshots and audit events.
//!
//! The detector never waits on storage. It hands commands to a bounded
//! queue with `try_send`; a spawned task drains the queue and writes to the
//! [`SnapshotStore`]. Each write attempt is bounded by a timeout and retried
//! with exponential backoff. Failures end up in the logs and in
//! [`PersistenceStatus`], never in the caller's hands.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{DetectorEvent, DetectorSnapshot, PersistenceConfig};
use crate::domain::ports::SnapshotStore;

/// Work handed to the persistence task.
#[derive(Debug)]
pub enum PersistenceCommand {
    Snapshot(Box<DetectorSnapshot>),
    Event(DetectorEvent),
    /// Acknowledged once every earlier command has been handled.
    Flush(oneshot::Sender<()>),
}

/// Counters describing what the persistence task has done so far.
#[derive(Debug, Clone, Default)]
pub struct PersistenceStatus {
    pub snapshots_written: u64,
    pub snapshot_failures: u64,
    pub events_written: u64,
    pub event_failures: u64,
    pub last_error: Option<String>,
}

/// Sending side of the persistence queue.
#[derive(Clone)]
pub struct PersistenceHandle {
    sender: mpsc::Sender<PersistenceCommand>,
    status: Arc<RwLock<PersistenceStatus>>,
    dropped: Arc<AtomicU64>,
}

impl PersistenceHandle {
    /// Enqueue without waiting. Returns `false` if the command was dropped.
    pub fn submit(&self, command: PersistenceCommand) -> bool {
        match self.sender.try_send(command) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(command)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(command = command.label(), "persistence queue full, dropping write");
                false
            }
            Err(mpsc::error::TrySendError::Closed(command)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(command = command.label(), "persistence worker stopped, dropping write");
                false
            }
        }
    }

    /// Wait until everything enqueued so far has been attempted.
    pub async fn flush(&self) -> DomainResult<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PersistenceCommand::Flush(tx))
            .await
            .map_err(|_| DomainError::ChannelClosed)?;
        rx.await.map_err(|_| DomainError::ChannelClosed)
    }

    pub async fn status(&self) -> PersistenceStatus {
        self.status.read().await.clone()
    }

    /// Commands discarded because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl PersistenceCommand {
    const fn label(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "snapshot",
            Self::Event(_) => "event",
            Self::Flush(_) => "flush",
        }
    }
}

/// Receiving side: owns the store and drains the queue.
pub struct PersistenceWorker {
    store: Arc<dyn SnapshotStore>,
    config: PersistenceConfig,
    receiver: mpsc::Receiver<PersistenceCommand>,
    status: Arc<RwLock<PersistenceStatus>>,
}

impl PersistenceWorker {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// The task exits once every [`PersistenceHandle`] clone is dropped and
    /// the queue is drained.
    pub fn spawn(
        store: Arc<dyn SnapshotStore>,
        config: PersistenceConfig,
    ) -> (PersistenceHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let status = Arc::new(RwLock::new(PersistenceStatus::default()));

        let handle = PersistenceHandle {
            sender,
            status: Arc::clone(&status),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        let worker = Self {
            store,
            config,
            receiver,
            status,
        };

        (handle, tokio::spawn(worker.run()))
    }

    async fn run(mut self) {
        info!("persistence worker started");

        while let Some(command) = self.receiver.recv().await {
            match command {
                PersistenceCommand::Snapshot(snapshot) => {
                    let snapshot: Arc<DetectorSnapshot> = Arc::from(snapshot);
                    let store = Arc::clone(&self.store);
                    let result = self
                        .with_retry("save_snapshot", move || {
                            let store = Arc::clone(&store);
                            let snapshot = Arc::clone(&snapshot);
                            async move { store.save(&snapshot).await }
                        })
                        .await;

                    let mut status = self.status.write().await;
                    match result {
                        Ok(()) => status.snapshots_written += 1,
                        Err(e) => {
                            warn!(error = %e, "snapshot write failed, giving up");
                            status.snapshot_failures += 1;
                            status.last_error = Some(e.to_string());
                        }
                    }
                }
                PersistenceCommand::Event(event) => {
                    let event = Arc::new(event);
                    let store = Arc::clone(&self.store);
                    let result = self
                        .with_retry("append_event", move || {
                            let store = Arc::clone(&store);
                            let event = Arc::clone(&event);
                            async move { store.append_event(&event).await }
                        })
                        .await;

                    let mut status = self.status.write().await;
                    match result {
                        Ok(()) => status.events_written += 1,
                        Err(e) => {
                            warn!(error = %e, "event append failed, giving up");
                            status.event_failures += 1;
                            status.last_error = Some(e.to_string());
                        }
                    }
                }
                PersistenceCommand::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }

        info!("persistence worker stopped");
    }

    /// Run `operation` with a per-attempt timeout and exponential backoff.
    ///
    /// Serialization errors are permanent; everything else is retried until
    /// `max_retry_elapsed_ms` runs out.
    async fn with_retry<F, Fut>(&self, operation_name: &'static str, mut operation: F) -> DomainResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DomainResult<()>>,
    {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.config.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(self.config.max_backoff_ms))
            .with_max_elapsed_time(Some(Duration::from_millis(
                self.config.max_retry_elapsed_ms,
            )))
            .build();

        let write_timeout = self.config.write_timeout();
        let timeout_ms = self.config.write_timeout_ms;
        let mut attempt: u32 = 0;

        backoff::future::retry(policy, || {
            attempt += 1;
            let current = attempt;
            let fut = operation();
            async move {
                match timeout(write_timeout, fut).await {
                    Ok(Ok(())) => {
                        if current > 1 {
                            debug!(operation = operation_name, attempt = current, "write succeeded after retry");
                        }
                        Ok(())
                    }
                    Ok(Err(e @ DomainError::SerializationError(_))) => {
                        Err(backoff::Error::permanent(e))
                    }
                    Ok(Err(e)) => {
                        warn!(operation = operation_name, attempt = current, error = %e, "write failed, retrying");
                        Err(backoff::Error::transient(e))
                    }
                    Err(_) => {
                        warn!(operation = operation_name, attempt = current, timeout_ms, "write timed out, retrying");
                        Err(backoff::Error::transient(DomainError::Timeout(timeout_ms)))
                    }
                }
            }
        })
        .await
    }
}
