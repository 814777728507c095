//! Position and portfolio tracking structures

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::market::{Market, Outcome};
use crate::serde_ext::u256_decimal;

/// A user's holding in one outcome of a market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPosition {
    /// Which outcome we hold (YES or NO)
    pub outcome: Outcome,

    /// Outcome tokens held (token base units)
    #[serde(with = "u256_decimal")]
    pub amount: U256,

    /// Whether the market has been resolved
    pub is_resolved: bool,

    /// Resolved and this position is on the winning side
    pub can_redeem: bool,
}

impl MarketPosition {
    /// Derive a position view from the market it belongs to
    pub fn for_market(market: &Market, outcome: Outcome, amount: U256) -> Self {
        Self {
            outcome,
            amount,
            is_resolved: market.is_resolved,
            can_redeem: market.winning_outcome() == Some(outcome),
        }
    }
}

/// A position together with the market it is held in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub market: Market,
    pub position: MarketPosition,
}

impl Holding {
    pub fn new(market: Market, outcome: Outcome, amount: U256) -> Self {
        let position = MarketPosition::for_market(&market, outcome, amount);
        Self { market, position }
    }
}

/// All holdings of one account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub holdings: Vec<Holding>,

    /// Distinct markets with a position
    pub total_markets: usize,

    /// Positions in markets that are still open
    pub open_positions: usize,

    /// Positions that can be redeemed for collateral
    pub redeemable_positions: usize,
}

impl Portfolio {
    /// Build a portfolio and calculate its totals
    pub fn new(holdings: Vec<Holding>) -> Self {
        let mut portfolio = Self {
            holdings,
            ..Default::default()
        };
        portfolio.calculate_totals();
        portfolio
    }

    /// An empty portfolio (no account connected)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Recalculate totals from holdings
    pub fn calculate_totals(&mut self) {
        self.total_markets = self
            .holdings
            .iter()
            .map(|h| h.market.id)
            .collect::<HashSet<_>>()
            .len();

        self.open_positions = self
            .holdings
            .iter()
            .filter(|h| !h.market.is_resolved)
            .count();

        self.redeemable_positions = self
            .holdings
            .iter()
            .filter(|h| h.position.can_redeem)
            .count();
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{MarketFacts, MarketStage};
    use alloy_primitives::{Address, B256};

    fn facts(byte: u8) -> MarketFacts {
        MarketFacts {
            question: "Question".to_string(),
            created_at: 0,
            stage: MarketStage::Running,
            market_maker: Address::repeat_byte(byte),
            conditional_tokens: Address::repeat_byte(0x22),
            collateral_token: Address::repeat_byte(0x33),
            condition_id: B256::ZERO,
            funding: U256::ZERO,
            volume: U256::ZERO,
        }
    }

    #[test]
    fn test_can_redeem_only_winning_side() {
        let market = Market::resolved(facts(1), Outcome::Yes, 100);

        let yes = MarketPosition::for_market(&market, Outcome::Yes, U256::from(10u64));
        let no = MarketPosition::for_market(&market, Outcome::No, U256::from(10u64));

        assert!(yes.is_resolved && yes.can_redeem);
        assert!(no.is_resolved && !no.can_redeem);
    }

    #[test]
    fn test_open_market_never_redeemable() {
        let market = Market::open(facts(1), 0.4, 0.6);
        let position = MarketPosition::for_market(&market, Outcome::Yes, U256::from(1u64));
        assert!(!position.is_resolved);
        assert!(!position.can_redeem);
    }

    #[test]
    fn test_portfolio_totals() {
        let open = Market::open(facts(1), 0.4, 0.6);
        let settled = Market::resolved(facts(2), Outcome::No, 100);

        let portfolio = Portfolio::new(vec![
            Holding::new(open.clone(), Outcome::Yes, U256::from(5u64)),
            Holding::new(open, Outcome::No, U256::from(3u64)),
            Holding::new(settled.clone(), Outcome::No, U256::from(7u64)),
            Holding::new(settled, Outcome::Yes, U256::from(2u64)),
        ]);

        assert_eq!(portfolio.total_markets, 2);
        assert_eq!(portfolio.open_positions, 2);
        assert_eq!(portfolio.redeemable_positions, 1);
    }

    #[test]
    fn test_empty_portfolio() {
        let portfolio = Portfolio::empty();
        assert!(portfolio.is_empty());
        assert_eq!(portfolio.total_markets, 0);
    }
}
