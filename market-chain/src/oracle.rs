//! Oracle controller trigger
//!
//! `addTrigger()` asks the off-chain oracle service to resolve the market.
//! The caller only consumes success/failure and, when the controller emits
//! `NewTrigger`, the trigger id.

use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::Log;
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use market_core::WriteError;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::bindings::{IOracleController, TriggerInfo};
use crate::wallet::AdminWallet;

/// Fee paid with each trigger to cover the oracle service (0.1 ETH)
pub const TRIGGER_FEE_WEI: u128 = 100_000_000_000_000_000;

/// Outcome of a mined trigger transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerReceipt {
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<u64>,
}

/// Something that can request oracle resolution
#[async_trait]
pub trait OracleTrigger: Send + Sync {
    async fn add_trigger(&self, fee: U256) -> Result<TriggerReceipt, WriteError>;
}

/// Oracle controller contract, signing with the admin wallet
pub struct OracleController {
    address: Address,
    sender: Address,
    provider: DynProvider,
}

impl OracleController {
    pub fn connect(rpc_url: Url, address: Address, wallet: &AdminWallet) -> Self {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(wallet.signer().clone()))
            .connect_http(rpc_url)
            .erased();

        Self {
            address,
            sender: wallet.address(),
            provider,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

impl std::fmt::Debug for OracleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleController")
            .field("address", &self.address)
            .field("sender", &self.sender)
            .finish()
    }
}

#[async_trait]
impl OracleTrigger for OracleController {
    async fn add_trigger(&self, fee: U256) -> Result<TriggerReceipt, WriteError> {
        info!(
            "Sending addTrigger() to {} from {} with value {}",
            self.address, self.sender, fee
        );

        let controller = IOracleController::new(self.address, self.provider.clone());

        let pending = controller
            .addTrigger()
            .value(fee)
            .send()
            .await
            .map_err(|e| WriteError::Submit(e.to_string()))?;

        let tx_hash = pending.tx_hash().to_string();

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| WriteError::Receipt(e.to_string()))?;

        if !receipt.status() {
            warn!("Oracle trigger {} reverted", tx_hash);
            return Err(WriteError::Reverted { tx_hash });
        }

        let trigger_id = receipt.inner.logs().iter().find_map(decode_new_trigger);

        info!("Oracle trigger {} mined (trigger id {:?})", tx_hash, trigger_id);

        Ok(TriggerReceipt {
            tx_hash,
            trigger_id,
        })
    }
}

/// Extract the trigger id from a `NewTrigger` log, if this log is one
fn decode_new_trigger(log: &Log) -> Option<u64> {
    let event = log.log_decode::<IOracleController::NewTrigger>().ok()?;
    decode_trigger_info(&event.inner.data.triggerInfo)
}

fn decode_trigger_info(payload: &Bytes) -> Option<u64> {
    TriggerInfo::abi_decode(payload)
        .ok()
        .map(|info| info.triggerId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_trigger_info() {
        let info = TriggerInfo {
            triggerId: 42,
            creator: Address::repeat_byte(0xaa),
            data: Bytes::from_static(b"payload"),
        };
        let encoded = Bytes::from(info.abi_encode());

        assert_eq!(decode_trigger_info(&encoded), Some(42));
    }

    #[test]
    fn test_decode_garbage_is_none() {
        assert_eq!(decode_trigger_info(&Bytes::from_static(&[1, 2, 3])), None);
    }

    #[test]
    fn test_trigger_fee_is_point_one_eth() {
        assert_eq!(U256::from(TRIGGER_FEE_WEI) * U256::from(10u8), U256::from(10u128.pow(18)));
    }

    #[test]
    fn test_receipt_json_format() {
        let receipt = TriggerReceipt {
            tx_hash: "0xabc".to_string(),
            trigger_id: None,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["txHash"], "0xabc");
        assert!(json.get("triggerId").is_none());
    }
}
