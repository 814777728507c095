//! Placeholder markets served when live data is unavailable
//!
//! The placeholder data has the same shape as live data so the UI keeps
//! working in demo mode. All timestamps are relative to the `now` passed in.

use alloy_primitives::{address, Address, B256, U256};
use market_core::{Holding, Market, MarketBoard, MarketFacts, MarketStage, Outcome, Portfolio};

const DAY: i64 = 86_400;

/// Whole tokens (18 decimals) as base units
fn tokens(amount: u64) -> U256 {
    U256::from(amount) * U256::from(10u64).pow(U256::from(18u8))
}

struct Placeholder {
    id: Address,
    question: &'static str,
    created_days_ago: i64,
    conditional_tokens: Address,
    collateral_token: Address,
    funding: u64,
    volume: u64,
}

impl Placeholder {
    fn facts(&self, now: i64, stage: MarketStage) -> MarketFacts {
        MarketFacts {
            question: self.question.to_string(),
            created_at: now - self.created_days_ago * DAY,
            stage,
            market_maker: self.id,
            conditional_tokens: self.conditional_tokens,
            collateral_token: self.collateral_token,
            condition_id: B256::ZERO,
            funding: tokens(self.funding),
            volume: tokens(self.volume),
        }
    }
}

const ACTIVE: Placeholder = Placeholder {
    id: address!("0x1234567890123456789012345678901234567890"),
    question: "Will Bitcoin price exceed $100,000 by end of 2024?",
    created_days_ago: 7,
    conditional_tokens: address!("0x2345678901234567890123456789012345678901"),
    collateral_token: address!("0x3456789012345678901234567890123456789012"),
    funding: 1000,
    volume: 500,
};

const ETH_POS: Placeholder = Placeholder {
    id: address!("0x2345678901234567890123456789012345678901"),
    question: "Will Ethereum switch to PoS before July 2025?",
    created_days_ago: 14,
    conditional_tokens: address!("0x3456789012345678901234567890123456789012"),
    collateral_token: address!("0x4567890123456789012345678901234567890123"),
    funding: 2000,
    volume: 1500,
};

const MARS: Placeholder = Placeholder {
    id: address!("0x3456789012345678901234567890123456789012"),
    question: "Will SpaceX successfully land on Mars by end of 2025?",
    created_days_ago: 30,
    conditional_tokens: address!("0x4567890123456789012345678901234567890123"),
    collateral_token: address!("0x5678901234567890123456789012345678901234"),
    funding: 3000,
    volume: 2500,
};

const FED_RATES: Placeholder = Placeholder {
    id: address!("0x3456789012345678901234567890123456789012"),
    question: "Will the US Federal Reserve raise interest rates in Q3 2025?",
    created_days_ago: 3,
    conditional_tokens: address!("0x4567890123456789012345678901234567890123"),
    collateral_token: address!("0x5678901234567890123456789012345678901234"),
    funding: 1500,
    volume: 300,
};

/// Source of placeholder markets and holdings
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackProvider;

impl FallbackProvider {
    /// The placeholder open market
    pub fn active_market(&self, now: i64) -> Market {
        Market::open(ACTIVE.facts(now, MarketStage::Running), 0.65, 0.35)
    }

    /// Settled placeholder markets, shown alongside live data as history
    pub fn historical_resolved(&self, now: i64) -> Vec<Market> {
        vec![
            Market::resolved(
                ETH_POS.facts(now, MarketStage::Closed),
                Outcome::Yes,
                now - 2 * DAY,
            ),
            Market::resolved(
                MARS.facts(now, MarketStage::Closed),
                Outcome::No,
                now - 3 * DAY,
            ),
        ]
    }

    /// One active and two resolved placeholder markets
    pub fn board(&self, now: i64) -> MarketBoard {
        MarketBoard::new(vec![self.active_market(now)], self.historical_resolved(now))
    }

    /// Placeholder holdings of a connected account
    pub fn holdings(&self, now: i64) -> Vec<Holding> {
        let eth_pos = Market::resolved(
            ETH_POS.facts(now, MarketStage::Closed),
            Outcome::Yes,
            now - 2 * DAY,
        );
        let fed_rates = Market::open(FED_RATES.facts(now, MarketStage::Running), 0.48, 0.52);

        vec![
            Holding::new(self.active_market(now), Outcome::Yes, tokens(100)),
            Holding::new(eth_pos, Outcome::Yes, tokens(200)),
            Holding::new(fed_rates, Outcome::No, tokens(150)),
        ]
    }

    pub fn portfolio(&self, now: i64) -> Portfolio {
        Portfolio::new(self.holdings(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;

    #[test]
    fn test_board_shape() {
        let board = FallbackProvider.board(NOW);

        assert_eq!(board.active.len(), 1);
        assert_eq!(board.resolved.len(), 2);

        let active = &board.active[0];
        assert_eq!(active.yes_price, 0.65);
        assert_eq!(active.no_price, 0.35);
        assert_eq!(active.created_at, NOW - 7 * DAY);
        assert!(!active.is_resolved);
        assert_eq!(active.funding, tokens(1000));
    }

    #[test]
    fn test_resolved_entries_carry_result_and_time() {
        let board = FallbackProvider.board(NOW);

        assert!(board.resolved.iter().all(|m| m.is_resolved));
        assert_eq!(board.resolved[0].result, Some(true));
        assert_eq!(board.resolved[0].resolved_at, Some(NOW - 2 * DAY));
        assert_eq!(board.resolved[1].result, Some(false));
        assert_eq!(board.resolved[1].resolved_at, Some(NOW - 3 * DAY));
    }

    #[test]
    fn test_board_is_deterministic_for_same_time() {
        assert_eq!(FallbackProvider.board(NOW), FallbackProvider.board(NOW));
    }

    #[test]
    fn test_placeholder_portfolio() {
        let portfolio = FallbackProvider.portfolio(NOW);

        assert_eq!(portfolio.holdings.len(), 3);
        assert_eq!(portfolio.open_positions, 2);
        assert_eq!(portfolio.redeemable_positions, 1);
        assert!(portfolio.holdings[1].position.can_redeem);
        assert_eq!(portfolio.holdings[2].position.outcome, Outcome::No);
    }
}
