//! Actor-based concurrency for the ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task executes every invocation, one at a time
//! - Each job runs inside its own transaction and commits atomically
//! - Async message passing with backpressure
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends jobs to actor mailbox                   │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ Transaction::begin → job → commit / discard    │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                       │                               │
//! │                       ▼                               │
//! │            StateStore::apply()                        │
//! │     (state writes + commit record, atomic)            │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Because jobs never interleave, two invocations that read-modify-write the
//! same keys (for example shared account balances touched by payments on
//! different trades) are serialized here rather than racing.
//!
//! A panicking job drops its transaction uncommitted and closes its caller's
//! response channel. The actor logs the panic and keeps serving. Release
//! builds use `panic = "abort"`, where a panic ends the process instead.

use crate::metrics::Metrics;
use crate::storage::StateStore;
use crate::transaction::Transaction;
use crate::{Error, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Unit of work executed by the actor.
///
/// Returns the number of keys committed, if anything was committed.
pub type Job = Box<dyn FnOnce(&dyn StateStore) -> Option<usize> + Send>;

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Execute a job in its own transaction
    Execute {
        /// The job
        job: Job,
    },

    /// Shutdown actor after draining earlier messages
    Shutdown {
        /// Acknowledgement
        response: oneshot::Sender<()>,
    },
}

impl std::fmt::Debug for LedgerMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerMessage::Execute { .. } => f.write_str("Execute"),
            LedgerMessage::Shutdown { .. } => f.write_str("Shutdown"),
        }
    }
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    /// Storage backend
    store: Arc<dyn StateStore>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Metrics
    metrics: Metrics,
}

impl std::fmt::Debug for LedgerActor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerActor").finish_non_exhaustive()
    }
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        store: Arc<dyn StateStore>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            mailbox,
            metrics,
        }
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let LedgerActor {
            store,
            mut mailbox,
            metrics,
        } = self;
        let mut shutdown_ack = None;

        while let Some(msg) = mailbox.recv().await {
            match msg {
                LedgerMessage::Execute { job } => {
                    metrics.jobs_total.inc();
                    match panic::catch_unwind(AssertUnwindSafe(|| job(store.as_ref()))) {
                        Ok(Some(writes)) => metrics.record_commit(writes),
                        Ok(None) => {}
                        Err(payload) => {
                            tracing::error!(panic = panic_message(&*payload), "Ledger job panicked");
                        }
                    }
                }
                LedgerMessage::Shutdown { response } => {
                    shutdown_ack = Some(response);
                    break;
                }
            }
        }

        // Release the store before acknowledging so it can be reopened
        drop(store);
        tracing::info!("Ledger actor stopped");

        if let Some(response) = shutdown_ack {
            let _ = response.send(());
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Handle for sending messages to the actor
#[derive(Clone, Debug)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    /// Run `f` inside a transaction on the actor; commit on `Ok`, discard on `Err`
    pub async fn execute<T, E, F>(&self, label: impl Into<String>, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<Error> + Send + 'static,
    {
        let label = label.into();
        let (tx, rx) = oneshot::channel();

        let job: Job = Box::new(move |store: &dyn StateStore| {
            let mut txn = match Transaction::begin(store, label) {
                Ok(txn) => txn,
                Err(e) => {
                    let _ = tx.send(Err(E::from(e)));
                    return None;
                }
            };
            let (result, committed) = match f(&mut txn) {
                Ok(value) => match txn.commit() {
                    Ok(record) => (Ok(value), record.map(|r| r.writes.len())),
                    Err(e) => (Err(E::from(e)), None),
                },
                Err(e) => (Err(e), None),
            };
            let _ = tx.send(result);
            committed
        });

        self.sender
            .send(LedgerMessage::Execute { job })
            .await
            .map_err(|_| E::from(Error::Concurrency("Actor mailbox closed".to_string())))?;

        rx.await
            .map_err(|_| E::from(Error::Concurrency("Response channel closed".to_string())))?
    }

    /// Shutdown actor, waiting until earlier jobs have run
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerMessage::Shutdown { response: tx })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    store: Arc<dyn StateStore>,
    mailbox_capacity: usize,
    metrics: Metrics,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1)); // Bounded channel for backpressure
    let actor = LedgerActor::new(store, rx, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
