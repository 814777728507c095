//! Account positions and collateral balance
//!
//! Positions are derived from conditional token balances of the markets read
//! live in the current snapshot. Placeholder markets are never queried.

use alloy_primitives::{Address, B256, U256};
use futures::future::try_join_all;
use market_chain::ContractGateway;
use market_core::{Holding, Market, Outcome, Portfolio, ReadResult};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::aggregator::{FallbackReason, Provenance, ReadContext};
use crate::clock::Clock;
use crate::fallback::FallbackProvider;
use crate::store::Snapshot;
use crate::view::format_token_amount;

/// Portfolio together with where its data came from
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRead {
    pub portfolio: Portfolio,
    pub provenance: Provenance,
}

/// Collateral token balance of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    #[serde(with = "market_core::serde_ext::address_checksum")]
    pub token: Address,
    pub symbol: String,
    pub decimals: u8,
    #[serde(with = "market_core::serde_ext::u256_decimal")]
    pub raw: U256,
    /// Display amount with two decimals
    pub formatted: String,
}

/// Reads account holdings from conditional tokens
pub struct PortfolioReader {
    fallback: FallbackProvider,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl PortfolioReader {
    pub fn new(clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            fallback: FallbackProvider,
            clock,
            timeout,
        }
    }

    /// Positions of `account` in the live markets of `snapshot`
    ///
    /// No account gives an empty portfolio. Without live data, or when any
    /// balance read fails, the placeholder holdings are returned instead.
    #[instrument(skip(self, ctx, snapshot))]
    pub async fn portfolio(
        &self,
        ctx: &ReadContext,
        account: Option<Address>,
        snapshot: Option<&Snapshot>,
    ) -> PortfolioRead {
        let Some(account) = account else {
            return PortfolioRead {
                portfolio: Portfolio::empty(),
                provenance: Provenance::Live,
            };
        };

        let now = self.clock.now();

        let live_markets: Vec<&Market> = match snapshot {
            Some(snapshot) if snapshot.is_live() => snapshot
                .board
                .markets()
                .filter(|m| snapshot.is_live_market(&m.id))
                .collect(),
            Some(snapshot) => {
                debug!("No live market data, serving placeholder holdings");
                return self.placeholder(now, snapshot.provenance.clone());
            }
            None => {
                debug!("No snapshot yet, serving placeholder holdings");
                return self.placeholder(now, Provenance::Fallback(FallbackReason::Pending));
            }
        };

        let reads = try_join_all(
            live_markets
                .into_iter()
                .map(|market| read_holdings(ctx.gateway.as_ref(), market, account)),
        );

        match tokio::time::timeout(self.timeout, reads).await {
            Ok(Ok(holdings)) => {
                let holdings: Vec<Holding> = holdings.into_iter().flatten().collect();
                debug!("Account {} holds {} positions", account, holdings.len());
                PortfolioRead {
                    portfolio: Portfolio::new(holdings),
                    provenance: Provenance::Live,
                }
            }
            Ok(Err(e)) => {
                warn!("Failed to read positions of {}: {}", account, e);
                self.placeholder(now, Provenance::Fallback(FallbackReason::ReadFailed(e.to_string())))
            }
            Err(_) => {
                warn!("Reading positions of {} timed out", account);
                self.placeholder(now, Provenance::Fallback(FallbackReason::TimedOut))
            }
        }
    }

    fn placeholder(&self, now: i64, provenance: Provenance) -> PortfolioRead {
        PortfolioRead {
            portfolio: self.fallback.portfolio(now),
            provenance,
        }
    }

    /// Collateral balance of `account`, formatted with the token's decimals
    #[instrument(skip(self, ctx))]
    pub async fn collateral_balance(
        &self,
        ctx: &ReadContext,
        token: Address,
        account: Address,
    ) -> ReadResult<TokenBalance> {
        let gateway = ctx.gateway.as_ref();
        let (raw, decimals, symbol) = tokio::try_join!(
            gateway.token_balance(token, account),
            gateway.token_decimals(token),
            gateway.token_symbol(token),
        )?;

        Ok(TokenBalance {
            token,
            formatted: format_token_amount(raw, decimals),
            symbol,
            decimals,
            raw,
        })
    }
}

/// Non-zero YES then NO positions of `account` in one market
async fn read_holdings(
    gateway: &dyn ContractGateway,
    market: &Market,
    account: Address,
) -> ReadResult<Vec<Holding>> {
    let (yes, no) = tokio::try_join!(
        position_balance(gateway, market, account, Outcome::Yes),
        position_balance(gateway, market, account, Outcome::No),
    )?;

    Ok([(Outcome::Yes, yes), (Outcome::No, no)]
        .into_iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(outcome, amount)| Holding::new(market.clone(), outcome, amount))
        .collect())
}

async fn position_balance(
    gateway: &dyn ContractGateway,
    market: &Market,
    account: Address,
    outcome: Outcome,
) -> ReadResult<U256> {
    let ct = market.conditional_tokens_address;

    let collection_id = gateway
        .collection_id(ct, B256::ZERO, market.condition_id, outcome.index_set())
        .await?;
    let position_id = gateway
        .position_id(ct, market.collateral_token_address, collection_id)
        .await?;

    gateway.position_balance(ct, account, position_id).await
}
