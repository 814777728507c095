//! Market state aggregation
//!
//! Combines the market maker, conditional tokens and price reads into one
//! [`MarketBoard`]. A refresh either produces a fully live board or the
//! placeholder board; fields from a partially failed read never leak.

use alloy_primitives::{Address, B256, U256};
use market_chain::ContractGateway;
use market_core::{Market, MarketBoard, MarketFacts, Outcome, ReadResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::Clock;
use crate::fallback::FallbackProvider;
use crate::price::normalize_price;
use crate::resolution::{detect_resolution, ConditionState};

/// Question shown for the configured market (not stored on-chain)
pub const DEFAULT_QUESTION: &str = "Will the price of Bitcoin be above $1 for the whole day?";

/// Volume shown until traded volume can be read (500 tokens)
pub const DEFAULT_VOLUME_ESTIMATE: u128 = 500_000_000_000_000_000_000;

/// Hard bound on one refresh
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Off-chain metadata of the configured market
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketMetadata {
    pub question: String,
    pub created_at: i64,
}

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    pub metadata: MarketMetadata,
    pub volume_estimate: U256,
    pub timeout: Duration,
}

impl AggregatorSettings {
    /// Settings with default question, volume and timeout
    pub fn new(created_at: i64) -> Self {
        Self {
            metadata: MarketMetadata {
                question: DEFAULT_QUESTION.to_string(),
                created_at,
            },
            volume_estimate: U256::from(DEFAULT_VOLUME_ESTIMATE),
            timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }
}

/// Chain connection shared by every refresh
#[derive(Clone)]
pub struct ReadContext {
    pub chain_id: u64,
    pub gateway: Arc<dyn ContractGateway>,
}

impl ReadContext {
    pub fn new(chain_id: u64, gateway: Arc<dyn ContractGateway>) -> Self {
        Self { chain_id, gateway }
    }
}

impl std::fmt::Debug for ReadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadContext")
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

/// Inputs a refresh depends on; a change triggers a new refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshInputs {
    /// Connected account, if any
    pub account: Option<Address>,
    /// Configured market maker; absent means demo mode
    pub market_maker: Option<Address>,
}

/// Why placeholder data was served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    ConfigurationAbsent,
    /// No refresh has completed yet
    Pending,
    ReadFailed(String),
    TimedOut,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::ConfigurationAbsent => write!(f, "market maker address not configured"),
            FallbackReason::Pending => write!(f, "waiting for first refresh"),
            FallbackReason::ReadFailed(msg) => write!(f, "contract read failed: {}", msg),
            FallbackReason::TimedOut => write!(f, "refresh timed out"),
        }
    }
}

/// Where the data of a refresh came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Live,
    Fallback(FallbackReason),
}

impl Provenance {
    pub fn is_live(&self) -> bool {
        matches!(self, Provenance::Live)
    }

    /// Short machine-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Fallback(_) => "fallback",
        }
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Provenance::Live => None,
            Provenance::Fallback(reason) => Some(reason),
        }
    }
}

/// Result of one refresh
#[derive(Debug, Clone, PartialEq)]
pub struct Refresh {
    pub board: MarketBoard,
    pub provenance: Provenance,
    /// When the refresh started (unix seconds)
    pub observed_at: i64,
}

impl Refresh {
    pub fn is_live(&self) -> bool {
        self.provenance.is_live()
    }
}

/// Builds market boards from contract reads
pub struct MarketAggregator {
    settings: AggregatorSettings,
    fallback: FallbackProvider,
    clock: Arc<dyn Clock>,
    /// Placeholder dates are relative to this instant
    placeholder_at: i64,
    /// First refresh time that saw each (market maker, condition) reported
    first_reported: Mutex<HashMap<(Address, B256), i64>>,
}

impl MarketAggregator {
    pub fn new(settings: AggregatorSettings, clock: Arc<dyn Clock>) -> Self {
        let placeholder_at = clock.now();
        Self {
            settings,
            fallback: FallbackProvider,
            clock,
            placeholder_at,
            first_reported: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    pub fn fallback(&self) -> &FallbackProvider {
        &self.fallback
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Read the configured market and assemble a board
    ///
    /// Never fails: a missing address, any failed read or a timeout yields
    /// the placeholder board with the reason recorded in the provenance.
    #[instrument(skip(self, ctx), fields(chain_id = ctx.chain_id))]
    pub async fn refresh(&self, ctx: &ReadContext, market_maker: Option<Address>) -> Refresh {
        let now = self.clock.now();

        let Some(market_maker) = market_maker else {
            warn!("Market maker address not configured, serving placeholder markets");
            return self.placeholder(now, FallbackReason::ConfigurationAbsent);
        };

        let read = self.read_board(ctx.gateway.as_ref(), market_maker, now);

        match tokio::time::timeout(self.settings.timeout, read).await {
            Ok(Ok(board)) => {
                debug!(
                    "Market {} refreshed ({} active, {} resolved)",
                    market_maker,
                    board.active.len(),
                    board.resolved.len()
                );
                Refresh {
                    board,
                    provenance: Provenance::Live,
                    observed_at: now,
                }
            }
            Ok(Err(e)) => {
                error!("Failed to read market {}: {}", market_maker, e);
                self.placeholder(now, FallbackReason::ReadFailed(e.to_string()))
            }
            Err(_) => {
                error!(
                    "Refresh of market {} timed out after {:?}",
                    market_maker, self.settings.timeout
                );
                self.placeholder(now, FallbackReason::TimedOut)
            }
        }
    }

    fn placeholder(&self, now: i64, reason: FallbackReason) -> Refresh {
        Refresh {
            board: self.fallback.board(self.placeholder_at),
            provenance: Provenance::Fallback(reason),
            observed_at: now,
        }
    }

    async fn read_board(
        &self,
        gateway: &dyn ContractGateway,
        market_maker: Address,
        now: i64,
    ) -> ReadResult<MarketBoard> {
        let (conditional_tokens, collateral_token, condition_id, funding, stage) = tokio::try_join!(
            gateway.pm_system(market_maker),
            gateway.collateral_token(market_maker),
            gateway.condition_id(market_maker, 0),
            gateway.funding(market_maker),
            gateway.stage(market_maker),
        )?;

        let facts = MarketFacts {
            question: self.settings.metadata.question.clone(),
            created_at: self.settings.metadata.created_at,
            stage,
            market_maker,
            conditional_tokens,
            collateral_token,
            condition_id,
            funding,
            volume: self.settings.volume_estimate,
        };

        let state = detect_resolution(gateway, conditional_tokens, condition_id).await?;
        let historical = self.fallback.historical_resolved(self.placeholder_at);

        match state {
            ConditionState::Open => {
                let (yes, no) = tokio::try_join!(
                    gateway.marginal_price(market_maker, Outcome::Yes),
                    gateway.marginal_price(market_maker, Outcome::No),
                )?;

                let market = Market::open(facts, normalize_price(yes), normalize_price(no));
                Ok(MarketBoard::new(vec![market], historical))
            }
            ConditionState::Resolved(resolution) => {
                info!("Market {} resolved to {}", market_maker, resolution.winner);

                let resolved_at = *self
                    .first_reported
                    .lock()
                    .entry((market_maker, condition_id))
                    .or_insert(now);

                let mut resolved = Vec::with_capacity(historical.len() + 1);
                resolved.push(Market::resolved(facts, resolution.winner, resolved_at));
                resolved.extend(historical);
                Ok(MarketBoard::new(Vec::new(), resolved))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use market_chain::testing::{FakeChain, FakeMarketMaker, ReadCall, ONE};
    use market_core::ReadError;

    const NOW: i64 = 1_760_000_000;
    const MM: Address = Address::repeat_byte(0x11);

    fn setup() -> (Arc<FakeChain>, MarketAggregator, ReadContext) {
        let chain = Arc::new(FakeChain::new());
        chain.add_market(
            MM,
            FakeMarketMaker::new(
                Address::repeat_byte(0x22),
                Address::repeat_byte(0x33),
                alloy_primitives::B256::repeat_byte(0x44),
            ),
        );
        let aggregator =
            MarketAggregator::new(AggregatorSettings::new(NOW - 3600), Arc::new(FixedClock::new(NOW)));
        let ctx = ReadContext::new(31337, chain.clone());
        (chain, aggregator, ctx)
    }

    #[tokio::test]
    async fn test_open_market_is_active() {
        let (chain, aggregator, ctx) = setup();
        chain.set_prices(MM, U256::from(650_000_000_000_000_000u128), U256::from(350_000_000_000_000_000u128));

        let refresh = aggregator.refresh(&ctx, Some(MM)).await;

        assert!(refresh.is_live());
        assert_eq!(refresh.board.active.len(), 1);
        let market = &refresh.board.active[0];
        assert_eq!(market.id, MM);
        assert!((market.yes_price - 0.65).abs() < 1e-12);
        assert!((market.no_price - 0.35).abs() < 1e-12);
        assert_eq!(market.question, DEFAULT_QUESTION);
        assert_eq!(market.funding, U256::from(1000u128 * ONE));
        assert_eq!(refresh.board.resolved, FallbackProvider.historical_resolved(NOW));
    }

    #[tokio::test]
    async fn test_resolved_market_moves_to_resolved_list() {
        let (chain, aggregator, ctx) = setup();
        chain.report_payouts(MM, &[0, 1]);

        let refresh = aggregator.refresh(&ctx, Some(MM)).await;

        assert!(refresh.is_live());
        assert!(refresh.board.active.is_empty());
        let market = &refresh.board.resolved[0];
        assert_eq!(market.id, MM);
        assert_eq!(market.result, Some(true));
        assert_eq!(market.resolved_at, Some(NOW));
        assert_eq!(chain.call_count(ReadCall::MarginalPrice), 0);
    }

    #[tokio::test]
    async fn test_resolved_market_is_stable_across_refreshes() {
        let (chain, _, ctx) = setup();
        let clock = Arc::new(FixedClock::new(NOW));
        let aggregator = MarketAggregator::new(AggregatorSettings::new(NOW - 3600), clock.clone());
        chain.report_payouts(MM, &[0, 1]);

        let first = aggregator.refresh(&ctx, Some(MM)).await;
        clock.advance(30);
        let second = aggregator.refresh(&ctx, Some(MM)).await;

        assert_eq!(second.board, first.board);
        assert_eq!(second.board.resolved[0].resolved_at, Some(NOW));
        assert_eq!(second.observed_at, NOW + 30);
    }

    #[tokio::test]
    async fn test_placeholder_board_is_stable_across_refreshes() {
        let (_, _, ctx) = setup();
        let clock = Arc::new(FixedClock::new(NOW));
        let aggregator = MarketAggregator::new(AggregatorSettings::new(NOW - 3600), clock.clone());

        clock.advance(30);
        let refresh = aggregator.refresh(&ctx, None).await;

        assert_eq!(refresh.board, FallbackProvider.board(NOW));
        assert_eq!(refresh.observed_at, NOW + 30);
    }

    #[tokio::test]
    async fn test_missing_address_serves_placeholder() {
        let (chain, aggregator, ctx) = setup();

        let refresh = aggregator.refresh(&ctx, None).await;

        assert_eq!(
            refresh.provenance,
            Provenance::Fallback(FallbackReason::ConfigurationAbsent)
        );
        assert_eq!(refresh.board, FallbackProvider.board(NOW));
        assert!(chain.calls().is_empty());
    }

    #[tokio::test]
    async fn test_price_failure_serves_placeholder_board() {
        let (chain, aggregator, ctx) = setup();
        chain.fail(ReadCall::MarginalPrice, ReadError::transport("connection reset"));

        let refresh = aggregator.refresh(&ctx, Some(MM)).await;

        assert_eq!(refresh.board, FallbackProvider.board(NOW));
        assert!(matches!(
            refresh.provenance,
            Provenance::Fallback(FallbackReason::ReadFailed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_chain_times_out() {
        let (chain, mut aggregator, ctx) = setup();
        aggregator.settings.timeout = Duration::from_secs(1);
        chain.set_latency(Some(Duration::from_secs(5)));

        let refresh = aggregator.refresh(&ctx, Some(MM)).await;

        assert_eq!(refresh.provenance, Provenance::Fallback(FallbackReason::TimedOut));
        assert_eq!(refresh.board, FallbackProvider.board(NOW));
    }
}
