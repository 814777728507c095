//! Background refresh scheduling
//!
//! A single task owns the refresh inputs. It starts a refresh on startup,
//! on every interval tick, on explicit request and whenever the inputs
//! change. Each refresh runs as its own task; results go through the
//! [`SnapshotStore`] so a slow, stale refresh cannot overwrite a newer one.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::aggregator::{MarketAggregator, ReadContext, RefreshInputs};
use crate::store::{Snapshot, SnapshotStore};

/// Default period between refreshes
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Request sent to the watcher task
#[derive(Debug)]
pub enum RefreshRequest {
    /// Refresh immediately
    Now,
    /// Replace the inputs; refreshes only if they differ
    SetInputs(RefreshInputs),
}

/// Watcher errors
#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("Market watcher has stopped")]
    Stopped,
}

/// Handle to the background refresh task
pub struct MarketWatcher {
    store: Arc<SnapshotStore>,
    requests: mpsc::Sender<RefreshRequest>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MarketWatcher {
    /// Start the refresh task; the first refresh begins immediately
    pub fn spawn(
        aggregator: Arc<MarketAggregator>,
        ctx: ReadContext,
        inputs: RefreshInputs,
        interval: Duration,
    ) -> Self {
        let store = Arc::new(SnapshotStore::new());
        let (requests, rx) = mpsc::channel::<RefreshRequest>(64);

        let task = tokio::spawn(Self::run(
            aggregator,
            ctx,
            Arc::clone(&store),
            inputs,
            interval,
            rx,
        ));

        Self {
            store,
            requests,
            task: Mutex::new(Some(task)),
        }
    }

    async fn run(
        aggregator: Arc<MarketAggregator>,
        ctx: ReadContext,
        store: Arc<SnapshotStore>,
        mut inputs: RefreshInputs,
        interval: Duration,
        mut rx: mpsc::Receiver<RefreshRequest>,
    ) {
        info!(
            "Market watcher started (every {:?}, market maker {:?})",
            interval, inputs.market_maker
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    Self::start_refresh(&mut in_flight, &aggregator, &ctx, &store, &inputs);
                }
                request = rx.recv() => match request {
                    Some(RefreshRequest::Now) => {
                        debug!("Refresh requested");
                        Self::start_refresh(&mut in_flight, &aggregator, &ctx, &store, &inputs);
                    }
                    Some(RefreshRequest::SetInputs(next)) => {
                        if next == inputs {
                            debug!("Refresh inputs unchanged");
                            continue;
                        }
                        info!("Refresh inputs changed: {:?}", next);
                        inputs = next;
                        Self::start_refresh(&mut in_flight, &aggregator, &ctx, &store, &inputs);
                    }
                    None => break,
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        if !e.is_cancelled() {
                            warn!("Refresh task failed: {}", e);
                        }
                    }
                }
            }
        }

        store.close();
        in_flight.abort_all();
        info!("Market watcher stopped");
    }

    fn start_refresh(
        in_flight: &mut JoinSet<()>,
        aggregator: &Arc<MarketAggregator>,
        ctx: &ReadContext,
        store: &Arc<SnapshotStore>,
        inputs: &RefreshInputs,
    ) {
        let ticket = store.begin();
        let aggregator = Arc::clone(aggregator);
        let ctx = ctx.clone();
        let store = Arc::clone(store);
        let inputs = inputs.clone();

        in_flight.spawn(async move {
            let refresh = aggregator.refresh(&ctx, inputs.market_maker).await;
            let outcome = store.complete(ticket, inputs, refresh);
            debug!("Refresh {} completed: {:?}", ticket.generation(), outcome);
        });
    }

    /// Ask for an immediate refresh
    pub async fn request_refresh(&self) -> Result<(), WatcherError> {
        self.requests
            .send(RefreshRequest::Now)
            .await
            .map_err(|_| WatcherError::Stopped)
    }

    /// Replace the refresh inputs (connected account, market maker)
    pub async fn set_inputs(&self, inputs: RefreshInputs) -> Result<(), WatcherError> {
        self.requests
            .send(RefreshRequest::SetInputs(inputs))
            .await
            .map_err(|_| WatcherError::Stopped)
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.store.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the task; in-flight refreshes are aborted and never published
    pub async fn shutdown(&self) {
        self.store.close();

        let task = self.task.lock().take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for MarketWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
