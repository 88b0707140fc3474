use std::sync::Arc;

use async_trait::async_trait;
use tokio::{
    sync::{
        mpsc::{self, error::TryRecvError},
        watch,
    },
    task::JoinHandle,
};

/// The request side of a batching queue. Implementors own the wire call
/// and decide what a failed batch means; the engine never retries and
/// never re-queues on their behalf.
#[async_trait]
pub trait BatchLookup: Send + Sync + 'static {
    /// The maximum number of IDs to hand to [`BatchLookup::run_batch`] at
    /// once. Keys beyond this are drained in a later pass.
    fn max_batch(&self) -> usize;

    /// Performs one combined request for the collected IDs. Duplicates may
    /// appear if the same ID was enqueued twice before a drain.
    async fn run_batch(&self, ids: Vec<i32>);

    /// Fired once each time the queue drains to empty after having done
    /// work. Runs on the worker task, so keep it short.
    async fn settled(&self);
}

/// A single-consumer batching queue with one background worker. Callers
/// enqueue scalar IDs from any thread without blocking; the worker drains
/// the queue in passes of up to [`BatchLookup::max_batch`] keys and hands
/// each pass to the lookup.
///
/// Dropping the queue (or calling [`BatchQueue::shutdown`]) requests
/// cooperative cancellation: the worker exits at the top of its next
/// iteration and an in-flight batch is allowed to finish.
pub struct BatchQueue {
    tx: mpsc::UnboundedSender<i32>,
    shutdown_tx: watch::Sender<bool>,
    worker: JoinHandle<()>,
}

impl BatchQueue {
    /// Launches the worker task for this queue.
    pub fn start<L: BatchLookup>(lookup: Arc<L>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(drain_loop(lookup, rx, shutdown_rx));
        Self {
            tx,
            shutdown_tx,
            worker,
        }
    }

    /// Queues an ID and wakes the worker if it is suspended. Non-blocking
    /// and safe from any thread. No deduplication is performed here.
    pub fn enqueue(&self, id: i32) {
        if self.tx.send(id).is_err() {
            log::warn!("enqueue after worker exit; id {id} dropped");
        }
    }

    /// Requests cooperative shutdown. Idempotent; returns without waiting
    /// for the worker to finish.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }
}

impl Drop for BatchQueue {
    fn drop(&mut self) {
        // Cooperative only; the worker also notices the sender closing.
        let _ = self.shutdown_tx.send(true);
    }
}

async fn drain_loop<L: BatchLookup>(
    lookup: Arc<L>,
    mut rx: mpsc::UnboundedReceiver<i32>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let max_batch = lookup.max_batch().max(1);
    let mut cleared = false;
    log::debug!("batch worker starting, max batch {max_batch}");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let mut batch = Vec::new();
        match rx.try_recv() {
            Ok(id) => batch.push(id),
            Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {
                if cleared {
                    // The queue fully drained after doing work.
                    lookup.settled().await;
                    cleared = false;
                }
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(id) => batch.push(id),
                        None => break,
                    },
                    changed = shutdown_rx.changed() => {
                        if shutdown_signaled(changed, &shutdown_rx) {
                            break;
                        }
                        continue;
                    }
                }
            }
        }

        while batch.len() < max_batch {
            match rx.try_recv() {
                Ok(id) => batch.push(id),
                Err(_) => break,
            }
        }

        log::trace!("draining batch of {}", batch.len());
        lookup.run_batch(batch).await;
        cleared = true;
    }

    log::debug!("batch worker exiting");
}

fn shutdown_signaled(
    changed: Result<(), watch::error::RecvError>,
    shutdown_rx: &watch::Receiver<bool>,
) -> bool {
    changed.is_err() || *shutdown_rx.borrow()
}
