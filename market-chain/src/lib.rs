//! Market Chain - typed access to the prediction market contracts
//!
//! This crate provides:
//! - `sol!` bindings for the market maker, conditional tokens, collateral
//!   token and oracle controller
//! - The read-only [`ContractGateway`] used by the aggregation layer, and its
//!   JSON-RPC implementation
//! - The admin wallet and the oracle controller trigger (the only write)

pub mod bindings;
pub mod gateway;
pub mod oracle;
pub mod rpc;
pub mod wallet;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use gateway::ContractGateway;
pub use oracle::{OracleController, OracleTrigger, TriggerReceipt, TRIGGER_FEE_WEI};
pub use rpc::RpcGateway;
pub use wallet::{AdminWallet, WalletError};
