//! In-memory chain for tests
//!
//! [`FakeChain`] implements [`ContractGateway`] over plain maps so that the
//! aggregation layer can be exercised without a node. Every read is recorded
//! in a call log, and any read kind can be made to fail.

use alloy::primitives::{keccak256, Address, B256, U256};
use async_trait::async_trait;
use market_core::{MarketStage, Outcome, ReadError, ReadResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::gateway::ContractGateway;

/// Chain id reported by default (anvil)
pub const FAKE_CHAIN_ID: u64 = 31337;

/// One fixed-point unit (1e18)
pub const ONE: u128 = 1_000_000_000_000_000_000;

/// Kind of read, used for the call log and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadCall {
    ChainId,
    PmSystem,
    CollateralToken,
    ConditionId,
    Funding,
    Stage,
    MarginalPrice,
    PayoutDenominator,
    OutcomeSlotCount,
    PayoutNumerator,
    CollectionId,
    PositionId,
    PositionBalance,
    TokenBalance,
    TokenDecimals,
    TokenSymbol,
}

/// State of one deployed market maker
#[derive(Debug, Clone)]
pub struct FakeMarketMaker {
    pub conditional_tokens: Address,
    pub collateral_token: Address,
    pub condition_id: B256,
    pub funding: U256,
    pub stage: u8,
    /// Raw marginal prices indexed by outcome (0 = NO, 1 = YES)
    pub prices: [U256; 2],
}

impl FakeMarketMaker {
    /// A running market at 50/50 with 1000 tokens of funding
    pub fn new(conditional_tokens: Address, collateral_token: Address, condition_id: B256) -> Self {
        Self {
            conditional_tokens,
            collateral_token,
            condition_id,
            funding: U256::from(1000u128 * ONE),
            stage: 0,
            prices: [U256::from(ONE / 2), U256::from(ONE / 2)],
        }
    }
}

#[derive(Debug, Clone)]
struct FakeCondition {
    slot_count: U256,
    denominator: U256,
    numerators: Vec<U256>,
}

#[derive(Debug, Clone, Default)]
struct FakeToken {
    decimals: u8,
    symbol: String,
    balances: HashMap<Address, U256>,
}

#[derive(Debug, Default)]
struct FakeState {
    chain_id: u64,
    market_makers: HashMap<Address, FakeMarketMaker>,
    conditions: HashMap<(Address, B256), FakeCondition>,
    positions: HashMap<(Address, Address, U256), U256>,
    tokens: HashMap<Address, FakeToken>,
    failures: HashMap<ReadCall, ReadError>,
    calls: Vec<ReadCall>,
    latency: Option<Duration>,
}

/// In-memory [`ContractGateway`]
#[derive(Debug)]
pub struct FakeChain {
    state: Mutex<FakeState>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self::new()
    }
}

fn reverted() -> ReadError {
    ReadError::rejected("execution reverted")
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                chain_id: FAKE_CHAIN_ID,
                ..Default::default()
            }),
        }
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.lock().chain_id = chain_id;
    }

    /// Deploy a market maker together with its (unreported, two-slot) condition
    pub fn add_market(&self, market_maker: Address, mm: FakeMarketMaker) {
        let mut state = self.state.lock();
        state.conditions.insert(
            (mm.conditional_tokens, mm.condition_id),
            FakeCondition {
                slot_count: U256::from(2u8),
                denominator: U256::ZERO,
                numerators: vec![U256::ZERO; 2],
            },
        );
        state.tokens.entry(mm.collateral_token).or_insert_with(|| FakeToken {
            decimals: 18,
            symbol: "COL".to_string(),
            balances: HashMap::new(),
        });
        state.market_makers.insert(market_maker, mm);
    }

    pub fn set_prices(&self, market_maker: Address, yes: U256, no: U256) {
        if let Some(mm) = self.state.lock().market_makers.get_mut(&market_maker) {
            mm.prices = [no, yes];
        }
    }

    pub fn set_stage(&self, market_maker: Address, stage: u8) {
        if let Some(mm) = self.state.lock().market_makers.get_mut(&market_maker) {
            mm.stage = stage;
        }
    }

    pub fn set_funding(&self, market_maker: Address, funding: U256) {
        if let Some(mm) = self.state.lock().market_makers.get_mut(&market_maker) {
            mm.funding = funding;
        }
    }

    /// Report payouts for the market's condition; the denominator is their sum
    pub fn report_payouts(&self, market_maker: Address, payouts: &[u64]) {
        self.with_condition(market_maker, |condition| {
            condition.numerators = payouts.iter().map(|p| U256::from(*p)).collect();
            condition.denominator = condition
                .numerators
                .iter()
                .fold(U256::ZERO, |total, n| total + *n);
        });
    }

    /// Overwrite the denominator alone (numerators stay as they are)
    pub fn set_denominator(&self, market_maker: Address, denominator: U256) {
        self.with_condition(market_maker, |condition| condition.denominator = denominator);
    }

    pub fn set_slot_count(&self, market_maker: Address, slot_count: U256) {
        self.with_condition(market_maker, |condition| condition.slot_count = slot_count);
    }

    fn with_condition(&self, market_maker: Address, f: impl FnOnce(&mut FakeCondition)) {
        let mut state = self.state.lock();
        let Some(key) = state
            .market_makers
            .get(&market_maker)
            .map(|mm| (mm.conditional_tokens, mm.condition_id))
        else {
            return;
        };
        if let Some(condition) = state.conditions.get_mut(&key) {
            f(condition);
        }
    }

    /// Give `owner` outcome tokens of a deployed market
    pub fn credit_position(&self, market_maker: Address, owner: Address, outcome: Outcome, amount: U256) {
        let mut state = self.state.lock();
        let Some(mm) = state.market_makers.get(&market_maker).cloned() else {
            return;
        };
        let position_id = Self::position_id_for(mm.collateral_token, mm.condition_id, outcome);
        state
            .positions
            .insert((mm.conditional_tokens, owner, position_id), amount);
    }

    pub fn add_token(&self, token: Address, decimals: u8, symbol: &str) {
        let mut state = self.state.lock();
        let entry = state.tokens.entry(token).or_default();
        entry.decimals = decimals;
        entry.symbol = symbol.to_string();
    }

    pub fn set_token_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state
            .lock()
            .tokens
            .entry(token)
            .or_default()
            .balances
            .insert(owner, amount);
    }

    /// Make every subsequent read of this kind fail with `err`
    pub fn fail(&self, call: ReadCall, err: ReadError) {
        self.state.lock().failures.insert(call, err);
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Delay every read by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().latency = latency;
    }

    /// Every read issued so far, in order
    pub fn calls(&self) -> Vec<ReadCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, call: ReadCall) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn reset_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn derive_collection_id(parent: B256, condition_id: B256, index_set: U256) -> B256 {
        let mut packed = Vec::with_capacity(96);
        packed.extend_from_slice(parent.as_slice());
        packed.extend_from_slice(condition_id.as_slice());
        packed.extend_from_slice(&index_set.to_be_bytes::<32>());
        keccak256(packed)
    }

    fn derive_position_id(collateral_token: Address, collection_id: B256) -> U256 {
        let mut packed = Vec::with_capacity(52);
        packed.extend_from_slice(collateral_token.as_slice());
        packed.extend_from_slice(collection_id.as_slice());
        U256::from_be_bytes(keccak256(packed).0)
    }

    /// Position id this chain assigns to `outcome` of a top-level condition
    pub fn position_id_for(collateral_token: Address, condition_id: B256, outcome: Outcome) -> U256 {
        let collection = Self::derive_collection_id(B256::ZERO, condition_id, outcome.index_set());
        Self::derive_position_id(collateral_token, collection)
    }

    /// Record the call, apply latency and injected failures
    async fn enter(&self, call: ReadCall) -> ReadResult<()> {
        let latency = {
            let mut state = self.state.lock();
            state.calls.push(call);
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failure = self.state.lock().failures.get(&call).cloned();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn market_maker(&self, address: Address) -> ReadResult<FakeMarketMaker> {
        self.state
            .lock()
            .market_makers
            .get(&address)
            .cloned()
            .ok_or_else(reverted)
    }

    fn condition(&self, conditional_tokens: Address, condition_id: B256) -> ReadResult<FakeCondition> {
        self.state
            .lock()
            .conditions
            .get(&(conditional_tokens, condition_id))
            .cloned()
            .ok_or_else(reverted)
    }

    fn token(&self, token: Address) -> ReadResult<FakeToken> {
        self.state.lock().tokens.get(&token).cloned().ok_or_else(reverted)
    }
}

#[async_trait]
impl ContractGateway for FakeChain {
    async fn chain_id(&self) -> ReadResult<u64> {
        self.enter(ReadCall::ChainId).await?;
        Ok(self.state.lock().chain_id)
    }

    async fn pm_system(&self, market_maker: Address) -> ReadResult<Address> {
        self.enter(ReadCall::PmSystem).await?;
        Ok(self.market_maker(market_maker)?.conditional_tokens)
    }

    async fn collateral_token(&self, market_maker: Address) -> ReadResult<Address> {
        self.enter(ReadCall::CollateralToken).await?;
        Ok(self.market_maker(market_maker)?.collateral_token)
    }

    async fn condition_id(&self, market_maker: Address, index: u64) -> ReadResult<B256> {
        self.enter(ReadCall::ConditionId).await?;
        let mm = self.market_maker(market_maker)?;
        if index != 0 {
            return Err(reverted());
        }
        Ok(mm.condition_id)
    }

    async fn funding(&self, market_maker: Address) -> ReadResult<U256> {
        self.enter(ReadCall::Funding).await?;
        Ok(self.market_maker(market_maker)?.funding)
    }

    async fn stage(&self, market_maker: Address) -> ReadResult<MarketStage> {
        self.enter(ReadCall::Stage).await?;
        let raw = self.market_maker(market_maker)?.stage;
        MarketStage::try_from(raw)
            .map_err(|v| ReadError::malformed(format!("stage: unknown value {}", v)))
    }

    async fn marginal_price(&self, market_maker: Address, outcome: Outcome) -> ReadResult<U256> {
        self.enter(ReadCall::MarginalPrice).await?;
        Ok(self.market_maker(market_maker)?.prices[outcome.index() as usize])
    }

    async fn payout_denominator(
        &self,
        conditional_tokens: Address,
        condition_id: B256,
    ) -> ReadResult<U256> {
        self.enter(ReadCall::PayoutDenominator).await?;
        Ok(self.condition(conditional_tokens, condition_id)?.denominator)
    }

    async fn outcome_slot_count(
        &self,
        conditional_tokens: Address,
        condition_id: B256,
    ) -> ReadResult<U256> {
        self.enter(ReadCall::OutcomeSlotCount).await?;
        Ok(self.condition(conditional_tokens, condition_id)?.slot_count)
    }

    async fn payout_numerator(
        &self,
        conditional_tokens: Address,
        condition_id: B256,
        index: U256,
    ) -> ReadResult<U256> {
        self.enter(ReadCall::PayoutNumerator).await?;
        let condition = self.condition(conditional_tokens, condition_id)?;
        let index = usize::try_from(index).map_err(|_| reverted())?;
        condition.numerators.get(index).copied().ok_or_else(reverted)
    }

    async fn collection_id(
        &self,
        _conditional_tokens: Address,
        parent_collection_id: B256,
        condition_id: B256,
        index_set: U256,
    ) -> ReadResult<B256> {
        self.enter(ReadCall::CollectionId).await?;
        Ok(Self::derive_collection_id(parent_collection_id, condition_id, index_set))
    }

    async fn position_id(
        &self,
        _conditional_tokens: Address,
        collateral_token: Address,
        collection_id: B256,
    ) -> ReadResult<U256> {
        self.enter(ReadCall::PositionId).await?;
        Ok(Self::derive_position_id(collateral_token, collection_id))
    }

    async fn position_balance(
        &self,
        conditional_tokens: Address,
        owner: Address,
        position_id: U256,
    ) -> ReadResult<U256> {
        self.enter(ReadCall::PositionBalance).await?;
        Ok(self
            .state
            .lock()
            .positions
            .get(&(conditional_tokens, owner, position_id))
            .copied()
            .unwrap_or_default())
    }

    async fn token_balance(&self, token: Address, owner: Address) -> ReadResult<U256> {
        self.enter(ReadCall::TokenBalance).await?;
        Ok(self
            .token(token)?
            .balances
            .get(&owner)
            .copied()
            .unwrap_or_default())
    }

    async fn token_decimals(&self, token: Address) -> ReadResult<u8> {
        self.enter(ReadCall::TokenDecimals).await?;
        Ok(self.token(token)?.decimals)
    }

    async fn token_symbol(&self, token: Address) -> ReadResult<String> {
        self.enter(ReadCall::TokenSymbol).await?;
        Ok(self.token(token)?.symbol)
    }
}
