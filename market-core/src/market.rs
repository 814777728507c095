//! Market data structures for on-chain binary prediction markets

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::serde_ext::{address_checksum, u256_decimal};

/// Outcome of a binary market
///
/// Slot 0 is NO and slot 1 is YES, both for the market maker's
/// `calcMarginalPrice` and the conditional tokens' payout vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    No,
    Yes,
}

impl Outcome {
    /// Both outcomes in slot order
    pub const ALL: [Outcome; 2] = [Outcome::No, Outcome::Yes];

    /// Outcome slot index
    pub fn index(&self) -> u8 {
        match self {
            Outcome::No => 0,
            Outcome::Yes => 1,
        }
    }

    /// Index set bitmask used to derive the conditional-token collection id
    pub fn index_set(&self) -> U256 {
        U256::from(1u8) << (self.index() as usize)
    }

    /// Map a boolean market result (`true` = YES won) to an outcome
    pub fn from_result(yes_won: bool) -> Self {
        if yes_won {
            Outcome::Yes
        } else {
            Outcome::No
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::No => "NO",
            Outcome::Yes => "YES",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle stage reported by the market maker's `stage()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStage {
    /// Accepting trades
    #[default]
    Running,
    /// Trading halted; a resolved market is paused so holders can redeem
    Paused,
    /// Closed, outcome tokens returned to the owner
    Closed,
}

impl MarketStage {
    pub fn as_u8(&self) -> u8 {
        match self {
            MarketStage::Running => 0,
            MarketStage::Paused => 1,
            MarketStage::Closed => 2,
        }
    }
}

impl TryFrom<u8> for MarketStage {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MarketStage::Running),
            1 => Ok(MarketStage::Paused),
            2 => Ok(MarketStage::Closed),
            other => Err(other),
        }
    }
}

/// Everything known about a market before its resolution state is classified
#[derive(Debug, Clone, PartialEq)]
pub struct MarketFacts {
    pub question: String,
    pub created_at: i64,
    pub stage: MarketStage,
    pub market_maker: Address,
    pub conditional_tokens: Address,
    pub collateral_token: Address,
    pub condition_id: B256,
    pub funding: U256,
    pub volume: U256,
}

/// Canonical snapshot of one prediction market
///
/// Built fresh on every refresh. Use [`Market::open`] or [`Market::resolved`]
/// so that `resolved_at` and `result` are present exactly when the market is
/// resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// Stable identifier (the market maker's address)
    #[serde(with = "address_checksum")]
    pub id: Address,

    /// Human-readable proposition
    pub question: String,

    /// Creation time (unix seconds)
    pub created_at: i64,

    /// Resolution time (unix seconds), present iff resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,

    /// Whether the condition has been reported
    pub is_resolved: bool,

    /// `true` if YES won, present iff resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,

    /// Market maker lifecycle stage
    pub stage: MarketStage,

    #[serde(with = "address_checksum")]
    pub market_maker_address: Address,

    #[serde(with = "address_checksum")]
    pub conditional_tokens_address: Address,

    #[serde(with = "address_checksum")]
    pub collateral_token_address: Address,

    /// Condition tracked by the conditional tokens contract
    pub condition_id: B256,

    /// Collateral committed at creation (token base units)
    #[serde(with = "u256_decimal")]
    pub funding: U256,

    /// Cumulative traded collateral (token base units)
    #[serde(with = "u256_decimal")]
    pub volume: U256,

    /// YES probability (0.0 - 1.0)
    pub yes_price: f64,

    /// NO probability (0.0 - 1.0)
    pub no_price: f64,
}

impl Market {
    /// An unresolved market quoted at the given normalized prices
    pub fn open(facts: MarketFacts, yes_price: f64, no_price: f64) -> Self {
        Self::build(facts, None, None, yes_price, no_price)
    }

    /// A resolved market; prices settle at the payout (1 for the winner)
    pub fn resolved(facts: MarketFacts, winner: Outcome, resolved_at: i64) -> Self {
        let (yes_price, no_price) = match winner {
            Outcome::Yes => (1.0, 0.0),
            Outcome::No => (0.0, 1.0),
        };
        Self::build(
            facts,
            Some(resolved_at),
            Some(winner == Outcome::Yes),
            yes_price,
            no_price,
        )
    }

    fn build(
        facts: MarketFacts,
        resolved_at: Option<i64>,
        result: Option<bool>,
        yes_price: f64,
        no_price: f64,
    ) -> Self {
        Self {
            id: facts.market_maker,
            question: facts.question,
            created_at: facts.created_at,
            resolved_at,
            is_resolved: result.is_some(),
            result,
            stage: facts.stage,
            market_maker_address: facts.market_maker,
            conditional_tokens_address: facts.conditional_tokens,
            collateral_token_address: facts.collateral_token,
            condition_id: facts.condition_id,
            funding: facts.funding,
            volume: facts.volume,
            yes_price,
            no_price,
        }
    }

    /// The winning outcome, if resolved
    pub fn winning_outcome(&self) -> Option<Outcome> {
        self.result.map(Outcome::from_result)
    }

    /// Current price of one outcome
    pub fn price_of(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Yes => self.yes_price,
            Outcome::No => self.no_price,
        }
    }

    /// Check if outcome tokens can currently be bought
    pub fn is_tradeable(&self) -> bool {
        !self.is_resolved && self.stage == MarketStage::Running
    }

    /// Probability sample of the current prices
    pub fn probability_at(&self, timestamp: i64) -> MarketProbability {
        MarketProbability::new(timestamp, self.yes_price, self.no_price)
    }
}

/// Result set of one refresh: markets still trading and markets settled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketBoard {
    pub active: Vec<Market>,
    pub resolved: Vec<Market>,
}

impl MarketBoard {
    pub fn new(active: Vec<Market>, resolved: Vec<Market>) -> Self {
        Self { active, resolved }
    }

    /// Iterate over every market, active first
    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.active.iter().chain(self.resolved.iter())
    }

    /// Look up a market by id
    pub fn find(&self, id: &Address) -> Option<&Market> {
        self.markets().find(|m| &m.id == id)
    }

    /// Look up an active (unresolved) market by id
    pub fn find_active(&self, id: &Address) -> Option<&Market> {
        self.active.iter().find(|m| &m.id == id)
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.resolved.is_empty()
    }
}

/// One time-series sample of a market's probabilities
///
/// `yes_probability + no_probability` is always 1: the inputs are
/// renormalised, so the residual a cost-function market maker leaves between
/// its two marginal prices does not show up in charts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketProbability {
    pub timestamp: i64,
    pub yes_probability: f64,
    pub no_probability: f64,
}

impl MarketProbability {
    pub fn new(timestamp: i64, yes: f64, no: f64) -> Self {
        let total = yes + no;
        let yes_probability = if total.is_finite() && total > 0.0 {
            (yes / total).clamp(0.0, 1.0)
        } else {
            0.5
        };

        Self {
            timestamp,
            yes_probability,
            no_probability: 1.0 - yes_probability,
        }
    }
}
