//! Read-only contract gateway
//!
//! One method per on-chain fact the client needs. Every call is a pure,
//! idempotent read that returns a typed value or a
//! [`ReadError`](market_core::ReadError); retry and
//! fallback policy belong to the caller.

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use market_core::{MarketStage, Outcome, ReadResult};

/// Typed reads against the market maker, conditional tokens and collateral token
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Chain id of the connected network
    async fn chain_id(&self) -> ReadResult<u64>;

    // ------------------------------------------------------------------
    // Market maker
    // ------------------------------------------------------------------

    /// Conditional tokens contract backing the market maker (`pmSystem()`)
    async fn pm_system(&self, market_maker: Address) -> ReadResult<Address>;

    /// Collateral token (`collateralToken()`)
    async fn collateral_token(&self, market_maker: Address) -> ReadResult<Address>;

    /// Condition id for slot set `index` (`conditionIds(i)`)
    async fn condition_id(&self, market_maker: Address, index: u64) -> ReadResult<B256>;

    /// Collateral committed at creation (`funding()`)
    async fn funding(&self, market_maker: Address) -> ReadResult<U256>;

    /// Lifecycle stage (`stage()`); unknown stage values are malformed
    async fn stage(&self, market_maker: Address) -> ReadResult<MarketStage>;

    /// Raw fixed-point marginal price of one outcome (`calcMarginalPrice(i)`)
    async fn marginal_price(&self, market_maker: Address, outcome: Outcome) -> ReadResult<U256>;

    // ------------------------------------------------------------------
    // Conditional tokens
    // ------------------------------------------------------------------

    /// Zero while the condition is unreported
    async fn payout_denominator(
        &self,
        conditional_tokens: Address,
        condition_id: B256,
    ) -> ReadResult<U256>;

    async fn outcome_slot_count(
        &self,
        conditional_tokens: Address,
        condition_id: B256,
    ) -> ReadResult<U256>;

    /// Payout weight reported for slot `index`
    async fn payout_numerator(
        &self,
        conditional_tokens: Address,
        condition_id: B256,
        index: U256,
    ) -> ReadResult<U256>;

    async fn collection_id(
        &self,
        conditional_tokens: Address,
        parent_collection_id: B256,
        condition_id: B256,
        index_set: U256,
    ) -> ReadResult<B256>;

    async fn position_id(
        &self,
        conditional_tokens: Address,
        collateral_token: Address,
        collection_id: B256,
    ) -> ReadResult<U256>;

    /// ERC-1155 balance of an outcome position
    async fn position_balance(
        &self,
        conditional_tokens: Address,
        owner: Address,
        position_id: U256,
    ) -> ReadResult<U256>;

    // ------------------------------------------------------------------
    // Collateral token
    // ------------------------------------------------------------------

    async fn token_balance(&self, token: Address, owner: Address) -> ReadResult<U256>;

    async fn token_decimals(&self, token: Address) -> ReadResult<u8>;

    async fn token_symbol(&self, token: Address) -> ReadResult<String>;
}
