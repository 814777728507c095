//! Admin actions: oracle resolution requests

use alloy_primitives::{Address, U256};
use market_chain::{OracleTrigger, TriggerReceipt, TRIGGER_FEE_WEI};
use market_core::{Market, WriteError};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::watcher::MarketWatcher;

/// Admin action errors
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("No live market data; oracle triggers are disabled in demo mode")]
    NoLiveData,

    #[error("Market not found: {0}")]
    UnknownMarket(Address),

    #[error("Market {0} is already resolved")]
    AlreadyResolved(Address),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Oracle trigger for markets read from chain
pub struct AdminService {
    oracle: Arc<dyn OracleTrigger>,
    watcher: Arc<MarketWatcher>,
    fee: U256,
}

impl AdminService {
    pub fn new(oracle: Arc<dyn OracleTrigger>, watcher: Arc<MarketWatcher>) -> Self {
        Self {
            oracle,
            watcher,
            fee: U256::from(TRIGGER_FEE_WEI),
        }
    }

    pub fn fee(&self) -> U256 {
        self.fee
    }

    /// Markets an admin can act on: active markets read from chain
    pub fn triggerable_markets(&self) -> Vec<Market> {
        match self.watcher.current() {
            Some(snapshot) if snapshot.is_live() => snapshot
                .board
                .active
                .iter()
                .filter(|m| snapshot.is_live_market(&m.id))
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Ask the oracle to resolve `market_id`, then refresh
    #[instrument(skip(self))]
    pub async fn trigger_resolution(&self, market_id: Address) -> Result<TriggerReceipt, AdminError> {
        let snapshot = self.watcher.current().ok_or(AdminError::NoLiveData)?;

        if !snapshot.is_live() {
            return Err(AdminError::NoLiveData);
        }
        if !snapshot.is_live_market(&market_id) {
            return Err(AdminError::UnknownMarket(market_id));
        }
        if snapshot.board.find_active(&market_id).is_none() {
            return Err(AdminError::AlreadyResolved(market_id));
        }

        let receipt = self.oracle.add_trigger(self.fee).await?;
        info!(
            "Oracle trigger sent for {} (tx {}, trigger id {:?})",
            market_id, receipt.tx_hash, receipt.trigger_id
        );

        if let Err(e) = self.watcher.request_refresh().await {
            warn!("Could not refresh after oracle trigger: {}", e);
        }

        Ok(receipt)
    }
}
