//! Display formatting and view models
//!
//! Pure functions over the domain types. Nothing here fails: out-of-range
//! input renders as a placeholder.

use alloy_primitives::{Address, U256};
use chrono::DateTime;
use market_core::{Market, MarketPosition, MarketProbability, MarketStage, Outcome};
use rust_decimal::Decimal;
use serde::Serialize;

/// Rendered when a value cannot be shown
pub const PLACEHOLDER: &str = "--";

/// Rendered when a timestamp cannot be shown
pub const UNKNOWN_DATE: &str = "Unknown date";

/// Format a probability as a percentage with two decimals ("65.00%")
pub fn format_probability(probability: f64) -> String {
    if !probability.is_finite() {
        return PLACEHOLDER.to_string();
    }
    format!("{:.2}%", probability.clamp(0.0, 1.0) * 100.0)
}

/// Format a unix timestamp as a UTC date ("Oct 16, 2026")
pub fn format_date(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(dt) => dt.format("%b %-d, %Y").to_string(),
        None => UNKNOWN_DATE.to_string(),
    }
}

/// Shorten an address for display ("0x1234…abcd")
pub fn shorten_address(address: &Address) -> String {
    shorten_hex(&address.to_checksum(None))
}

/// Shorten any 0x-prefixed hex string; short input is returned unchanged
pub fn shorten_hex(value: &str) -> String {
    if value.is_empty() {
        return PLACEHOLDER.to_string();
    }
    if value.len() <= 10 || !value.is_ascii() {
        return value.to_string();
    }
    format!("{}…{}", &value[..6], &value[value.len() - 4..])
}

/// Format a token amount in base units with two decimals, truncated
pub fn format_token_amount(raw: U256, decimals: u8) -> String {
    let exact = u128::try_from(raw)
        .ok()
        .and_then(|v| i128::try_from(v).ok())
        .and_then(|v| Decimal::try_from_i128_with_scale(v, u32::from(decimals)).ok());

    match exact {
        Some(amount) => format!("{:.2}", amount.trunc_with_scale(2)),
        None => format_wide_amount(raw, decimals),
    }
}

/// Integer formatting for amounts outside `Decimal` range
fn format_wide_amount(raw: U256, decimals: u8) -> String {
    let Some(unit) = U256::from(10u8).checked_pow(U256::from(decimals)) else {
        return PLACEHOLDER.to_string();
    };
    let whole = raw / unit;
    let cents = (raw % unit).saturating_mul(U256::from(100u8)) / unit;
    format!("{}.{:02}", whole, u64::try_from(cents).unwrap_or(0))
}

/// Card view of a market
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketView {
    pub id: String,
    pub short_id: String,
    pub question: String,
    pub status: &'static str,
    pub created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'static str>,
    pub yes_probability: String,
    pub no_probability: String,
    pub funding: String,
    pub volume: String,
    pub tradeable: bool,
}

impl MarketView {
    pub fn from_market(market: &Market) -> Self {
        let status = if market.is_resolved {
            "Resolved"
        } else {
            match market.stage {
                MarketStage::Running => "Open",
                MarketStage::Paused => "Paused",
                MarketStage::Closed => "Closed",
            }
        };

        Self {
            id: market.id.to_checksum(None),
            short_id: shorten_address(&market.id),
            question: market.question.clone(),
            status,
            created: format_date(market.created_at),
            resolved: market.resolved_at.map(format_date),
            result: market.winning_outcome().map(|o| o.as_str()),
            yes_probability: format_probability(market.yes_price),
            no_probability: format_probability(market.no_price),
            funding: format_token_amount(market.funding, 18),
            volume: format_token_amount(market.volume, 18),
            tradeable: market.is_tradeable(),
        }
    }
}

/// Portfolio card of one position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionView {
    pub market: MarketView,
    pub outcome: Outcome,
    pub amount: String,
    /// "Open", "Win" or "Loss"
    pub status: &'static str,
    pub can_redeem: bool,
    pub action: &'static str,
}

impl PositionView {
    pub fn new(market: &Market, position: &MarketPosition) -> Self {
        let status = match market.winning_outcome() {
            None => "Open",
            Some(winner) if winner == position.outcome => "Win",
            Some(_) => "Loss",
        };

        Self {
            market: MarketView::from_market(market),
            outcome: position.outcome,
            amount: format_token_amount(position.amount, 18),
            status,
            can_redeem: position.can_redeem,
            action: if position.can_redeem {
                "Redeem Position"
            } else {
                "View Market"
            },
        }
    }
}

/// One point of the probability chart
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub timestamp: i64,
    pub date: String,
    pub yes_probability: f64,
    pub no_probability: f64,
    pub yes_pct: String,
    pub no_pct: String,
}

impl From<&MarketProbability> for ChartPoint {
    fn from(sample: &MarketProbability) -> Self {
        Self {
            timestamp: sample.timestamp,
            date: format_date(sample.timestamp),
            yes_probability: sample.yes_probability,
            no_probability: sample.no_probability,
            yes_pct: format!("{:.2}", sample.yes_probability * 100.0),
            no_pct: format!("{:.2}", sample.no_probability * 100.0),
        }
    }
}

/// Detail page of a market
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDetailView {
    pub market: MarketView,
    pub market_maker_address: String,
    pub conditional_tokens_address: String,
    pub collateral_token_address: String,
    pub condition_id: String,
    pub history: Vec<ChartPoint>,
}

impl MarketDetailView {
    pub fn new(market: &Market, history: &[MarketProbability]) -> Self {
        Self {
            market: MarketView::from_market(market),
            market_maker_address: market.market_maker_address.to_checksum(None),
            conditional_tokens_address: market.conditional_tokens_address.to_checksum(None),
            collateral_token_address: market.collateral_token_address.to_checksum(None),
            condition_id: market.condition_id.to_string(),
            history: history.iter().map(ChartPoint::from).collect(),
        }
    }
}
