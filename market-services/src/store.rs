//! Last-good snapshot store
//!
//! Refreshes may complete out of order. Each refresh takes a ticket when it
//! starts and its result is applied only if no newer refresh has already
//! been applied. The snapshot is swapped whole, never merged.

use alloy_primitives::Address;
use market_core::{MarketBoard, MarketProbability};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::aggregator::{Provenance, Refresh, RefreshInputs};
use crate::series::ProbabilityHistory;

/// Generation handed out when a refresh starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// An applied refresh
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub generation: u64,
    pub inputs: RefreshInputs,
    pub board: MarketBoard,
    pub provenance: Provenance,
    pub observed_at: i64,
}

impl Snapshot {
    pub fn is_live(&self) -> bool {
        self.provenance.is_live()
    }

    /// Whether `id` is the market read from chain (not a placeholder entry)
    pub fn is_live_market(&self, id: &Address) -> bool {
        self.is_live() && self.inputs.market_maker.as_ref() == Some(id)
    }
}

/// What happened to a completed refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Published as the current snapshot
    Applied,
    /// A newer refresh was applied first; discarded
    Superseded,
    /// Placeholder result while live data for the same inputs is held
    KeptLastGood,
    /// The store was closed; discarded
    Closed,
}

#[derive(Debug, Default)]
struct StoreState {
    next_generation: u64,
    applied_generation: u64,
    current: Option<Arc<Snapshot>>,
    history: HashMap<Address, ProbabilityHistory>,
    closed: bool,
}

/// Holds the current snapshot and per-market probability history
#[derive(Debug)]
pub struct SnapshotStore {
    state: Mutex<StoreState>,
    tx: watch::Sender<Option<Arc<Snapshot>>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            state: Mutex::new(StoreState::default()),
            tx,
        }
    }

    /// Take a ticket for a refresh that is about to start
    pub fn begin(&self) -> Ticket {
        let mut state = self.state.lock();
        state.next_generation += 1;
        Ticket(state.next_generation)
    }

    /// Offer a completed refresh
    pub fn complete(&self, ticket: Ticket, inputs: RefreshInputs, refresh: Refresh) -> ApplyOutcome {
        let snapshot = {
            let mut state = self.state.lock();

            if state.closed {
                return ApplyOutcome::Closed;
            }

            if ticket.0 <= state.applied_generation {
                debug!(
                    "Discarding refresh {} (generation {} already applied)",
                    ticket.0, state.applied_generation
                );
                return ApplyOutcome::Superseded;
            }
            state.applied_generation = ticket.0;

            let holds_live_for_inputs = state
                .current
                .as_ref()
                .is_some_and(|c| c.is_live() && c.inputs.market_maker == inputs.market_maker);

            if !refresh.is_live() && holds_live_for_inputs {
                debug!("Keeping last good snapshot over placeholder refresh {}", ticket.0);
                return ApplyOutcome::KeptLastGood;
            }

            if refresh.is_live() {
                for market in &refresh.board.active {
                    state
                        .history
                        .entry(market.id)
                        .or_default()
                        .record(market.probability_at(refresh.observed_at));
                }
            }

            let snapshot = Arc::new(Snapshot {
                generation: ticket.0,
                inputs,
                board: refresh.board,
                provenance: refresh.provenance,
                observed_at: refresh.observed_at,
            });
            state.current = Some(Arc::clone(&snapshot));
            snapshot
        };

        self.tx.send_replace(Some(snapshot));
        ApplyOutcome::Applied
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.state.lock().current.clone()
    }

    /// Observe every applied snapshot
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.tx.subscribe()
    }

    /// Recorded probability samples of a market, oldest first
    pub fn history(&self, id: &Address) -> Vec<MarketProbability> {
        self.state
            .lock()
            .history
            .get(id)
            .map(ProbabilityHistory::samples)
            .unwrap_or_default()
    }

    /// Chart series of a market starting at its creation
    pub fn series(&self, id: &Address, created_at: i64) -> Vec<MarketProbability> {
        let state = self.state.lock();
        match state.history.get(id) {
            Some(history) => history.series_from(created_at),
            None => ProbabilityHistory::default().series_from(created_at),
        }
    }

    /// Stop accepting refreshes
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
