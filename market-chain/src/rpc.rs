//! Contract reads over JSON-RPC
//!
//! Each gateway method builds a `sol!` contract instance on a shared HTTP
//! provider and issues a single `eth_call`.

use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use async_trait::async_trait;
use market_core::{MarketStage, Outcome, ReadError, ReadResult};
use tracing::debug;
use url::Url;

use crate::bindings::{IConditionalTokens, IERC20, ILMSRMarketMaker};
use crate::gateway::ContractGateway;

/// [`ContractGateway`] backed by an HTTP JSON-RPC node
#[derive(Clone)]
pub struct RpcGateway {
    provider: DynProvider,
    rpc_url: Url,
}

impl RpcGateway {
    /// Create a gateway for the given RPC endpoint
    ///
    /// No request is made until the first read.
    pub fn connect(rpc_url: Url) -> Self {
        let provider = ProviderBuilder::new()
            .connect_http(rpc_url.clone())
            .erased();

        Self { provider, rpc_url }
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    fn market_maker(&self, address: Address) -> ILMSRMarketMaker::ILMSRMarketMakerInstance<DynProvider> {
        ILMSRMarketMaker::new(address, self.provider.clone())
    }

    fn conditional_tokens(
        &self,
        address: Address,
    ) -> IConditionalTokens::IConditionalTokensInstance<DynProvider> {
        IConditionalTokens::new(address, self.provider.clone())
    }

    fn erc20(&self, address: Address) -> IERC20::IERC20Instance<DynProvider> {
        IERC20::new(address, self.provider.clone())
    }
}

impl std::fmt::Debug for RpcGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcGateway")
            .field("rpc_url", &self.rpc_url.as_str())
            .finish()
    }
}

/// Classify a failed call
///
/// A JSON-RPC error response (revert, unknown method) means the node
/// rejected the call; any other transport failure is a network problem;
/// undecodable return data is a malformed response.
fn read_error(method: &'static str, err: alloy::contract::Error) -> ReadError {
    match err {
        alloy::contract::Error::TransportError(e) => match e.as_error_resp() {
            Some(payload) => ReadError::rejected(format!("{}: {}", method, payload.message)),
            None => ReadError::transport(format!("{}: {}", method, e)),
        },
        alloy::contract::Error::AbiError(e) => {
            ReadError::malformed(format!("{}: {}", method, e))
        }
        other => ReadError::malformed(format!("{}: {}", method, other)),
    }
}

#[async_trait]
impl ContractGateway for RpcGateway {
    async fn chain_id(&self) -> ReadResult<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| match e.as_error_resp() {
                Some(payload) => ReadError::rejected(format!("eth_chainId: {}", payload.message)),
                None => ReadError::transport(format!("eth_chainId: {}", e)),
            })
    }

    async fn pm_system(&self, market_maker: Address) -> ReadResult<Address> {
        debug!("pmSystem() on {}", market_maker);
        self.market_maker(market_maker)
            .pmSystem()
            .call()
            .await
            .map_err(|e| read_error("pmSystem", e))
    }

    async fn collateral_token(&self, market_maker: Address) -> ReadResult<Address> {
        debug!("collateralToken() on {}", market_maker);
        self.market_maker(market_maker)
            .collateralToken()
            .call()
            .await
            .map_err(|e| read_error("collateralToken", e))
    }

    async fn condition_id(&self, market_maker: Address, index: u64) -> ReadResult<B256> {
        debug!("conditionIds({}) on {}", index, market_maker);
        self.market_maker(market_maker)
            .conditionIds(U256::from(index))
            .call()
            .await
            .map_err(|e| read_error("conditionIds", e))
    }

    async fn funding(&self, market_maker: Address) -> ReadResult<U256> {
        debug!("funding() on {}", market_maker);
        self.market_maker(market_maker)
            .funding()
            .call()
            .await
            .map_err(|e| read_error("funding", e))
    }

    async fn stage(&self, market_maker: Address) -> ReadResult<MarketStage> {
        debug!("stage() on {}", market_maker);
        let raw = self
            .market_maker(market_maker)
            .stage()
            .call()
            .await
            .map_err(|e| read_error("stage", e))?;

        MarketStage::try_from(raw)
            .map_err(|v| ReadError::malformed(format!("stage: unknown value {}", v)))
    }

    async fn marginal_price(&self, market_maker: Address, outcome: Outcome) -> ReadResult<U256> {
        debug!("calcMarginalPrice({}) on {}", outcome.index(), market_maker);
        self.market_maker(market_maker)
            .calcMarginalPrice(outcome.index())
            .call()
            .await
            .map_err(|e| read_error("calcMarginalPrice", e))
    }

    async fn payout_denominator(
        &self,
        conditional_tokens: Address,
        condition_id: B256,
    ) -> ReadResult<U256> {
        debug!("payoutDenominator({}) on {}", condition_id, conditional_tokens);
        self.conditional_tokens(conditional_tokens)
            .payoutDenominator(condition_id)
            .call()
            .await
            .map_err(|e| read_error("payoutDenominator", e))
    }

    async fn outcome_slot_count(
        &self,
        conditional_tokens: Address,
        condition_id: B256,
    ) -> ReadResult<U256> {
        debug!("getOutcomeSlotCount({}) on {}", condition_id, conditional_tokens);
        self.conditional_tokens(conditional_tokens)
            .getOutcomeSlotCount(condition_id)
            .call()
            .await
            .map_err(|e| read_error("getOutcomeSlotCount", e))
    }

    async fn payout_numerator(
        &self,
        conditional_tokens: Address,
        condition_id: B256,
        index: U256,
    ) -> ReadResult<U256> {
        debug!(
            "payoutNumerators({}, {}) on {}",
            condition_id, index, conditional_tokens
        );
        self.conditional_tokens(conditional_tokens)
            .payoutNumerators(condition_id, index)
            .call()
            .await
            .map_err(|e| read_error("payoutNumerators", e))
    }

    async fn collection_id(
        &self,
        conditional_tokens: Address,
        parent_collection_id: B256,
        condition_id: B256,
        index_set: U256,
    ) -> ReadResult<B256> {
        self.conditional_tokens(conditional_tokens)
            .getCollectionId(parent_collection_id, condition_id, index_set)
            .call()
            .await
            .map_err(|e| read_error("getCollectionId", e))
    }

    async fn position_id(
        &self,
        conditional_tokens: Address,
        collateral_token: Address,
        collection_id: B256,
    ) -> ReadResult<U256> {
        self.conditional_tokens(conditional_tokens)
            .getPositionId(collateral_token, collection_id)
            .call()
            .await
            .map_err(|e| read_error("getPositionId", e))
    }

    async fn position_balance(
        &self,
        conditional_tokens: Address,
        owner: Address,
        position_id: U256,
    ) -> ReadResult<U256> {
        debug!("balanceOf({}, {}) on {}", owner, position_id, conditional_tokens);
        self.conditional_tokens(conditional_tokens)
            .balanceOf(owner, position_id)
            .call()
            .await
            .map_err(|e| read_error("balanceOf", e))
    }

    async fn token_balance(&self, token: Address, owner: Address) -> ReadResult<U256> {
        debug!("balanceOf({}) on {}", owner, token);
        self.erc20(token)
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| read_error("balanceOf", e))
    }

    async fn token_decimals(&self, token: Address) -> ReadResult<u8> {
        self.erc20(token)
            .decimals()
            .call()
            .await
            .map_err(|e| read_error("decimals", e))
    }

    async fn token_symbol(&self, token: Address) -> ReadResult<String> {
        self.erc20(token)
            .symbol()
            .call()
            .await
            .map_err(|e| read_error("symbol", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_keeps_url() {
        let url: Url = "http://127.0.0.1:8545".parse().unwrap();
        let gateway = RpcGateway::connect(url.clone());
        assert_eq!(gateway.rpc_url(), &url);
        assert!(format!("{:?}", gateway).contains("127.0.0.1:8545"));
    }
}
