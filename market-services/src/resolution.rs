//! Resolution detection from the conditional tokens payout report

use alloy_primitives::{Address, B256, U256};
use market_chain::ContractGateway;
use market_core::{Outcome, ReadError, ReadResult};
use tracing::{debug, warn};

/// Upper bound on outcome slots read from a condition
pub const MAX_OUTCOME_SLOTS: u64 = 256;

/// Reported payouts of a resolved condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub winner: Outcome,
    /// Payout numerators, one per outcome slot
    pub payouts: Vec<U256>,
    ambiguous: bool,
}

impl Resolution {
    /// Classify a payout vector with at least two slots
    ///
    /// YES wins only with a strictly larger numerator; equal numerators
    /// resolve to NO and are marked ambiguous.
    pub fn from_payouts(payouts: Vec<U256>) -> Self {
        let no = payouts.first().copied().unwrap_or_default();
        let yes = payouts.get(1).copied().unwrap_or_default();

        Self {
            winner: Outcome::from_result(yes > no),
            ambiguous: yes == no,
            payouts,
        }
    }

    /// Both outcomes were reported with equal weight
    pub fn is_ambiguous(&self) -> bool {
        self.ambiguous
    }
}

/// Whether a condition has been reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionState {
    Open,
    Resolved(Resolution),
}

impl ConditionState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ConditionState::Resolved(_))
    }
}

/// Determine whether `condition_id` has been resolved, and to which outcome
///
/// A zero payout denominator means unresolved and nothing else is read.
/// Otherwise the slot count is read, then each numerator in slot order.
pub async fn detect_resolution(
    gateway: &dyn ContractGateway,
    conditional_tokens: Address,
    condition_id: B256,
) -> ReadResult<ConditionState> {
    let denominator = gateway
        .payout_denominator(conditional_tokens, condition_id)
        .await?;

    if denominator.is_zero() {
        debug!("Condition {} not reported", condition_id);
        return Ok(ConditionState::Open);
    }

    let slot_count = gateway
        .outcome_slot_count(conditional_tokens, condition_id)
        .await?;
    let slot_count = u64::try_from(slot_count)
        .map_err(|_| ReadError::malformed(format!("outcome slot count {} out of range", slot_count)))?;

    if !(2..=MAX_OUTCOME_SLOTS).contains(&slot_count) {
        return Err(ReadError::malformed(format!(
            "binary condition {} has {} outcome slots",
            condition_id, slot_count
        )));
    }

    let mut payouts = Vec::new();
    for index in 0..slot_count {
        let numerator = gateway
            .payout_numerator(conditional_tokens, condition_id, U256::from(index))
            .await?;
        payouts.push(numerator);
    }

    let resolution = Resolution::from_payouts(payouts);

    if resolution.is_ambiguous() {
        warn!(
            "Condition {} reported equal payouts {:?}, treating as NO",
            condition_id, resolution.payouts
        );
    } else {
        debug!(
            "Condition {} resolved to {} (payouts {:?}, denominator {})",
            condition_id, resolution.winner, resolution.payouts, denominator
        );
    }

    Ok(ConditionState::Resolved(resolution))
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_chain::testing::{FakeChain, FakeMarketMaker, ReadCall};

    const MM: Address = Address::repeat_byte(0x11);
    const CT: Address = Address::repeat_byte(0x22);
    const CONDITION: B256 = B256::repeat_byte(0x44);

    fn chain() -> FakeChain {
        let chain = FakeChain::new();
        chain.add_market(
            MM,
            FakeMarketMaker::new(CT, Address::repeat_byte(0x33), CONDITION),
        );
        chain
    }

    fn detect(chain: &FakeChain) -> ReadResult<ConditionState> {
        tokio_test::block_on(detect_resolution(chain, CT, CONDITION))
    }

    #[test]
    fn test_zero_denominator_is_open_without_numerator_reads() {
        let chain = chain();

        assert_eq!(detect(&chain).unwrap(), ConditionState::Open);
        assert_eq!(chain.call_count(ReadCall::OutcomeSlotCount), 0);
        assert_eq!(chain.call_count(ReadCall::PayoutNumerator), 0);
    }

    #[test]
    fn test_yes_wins() {
        let chain = chain();
        chain.report_payouts(MM, &[0, 1]);

        let ConditionState::Resolved(resolution) = detect(&chain).unwrap() else {
            panic!("expected resolved");
        };
        assert_eq!(resolution.winner, Outcome::Yes);
        assert!(!resolution.is_ambiguous());
        assert_eq!(chain.call_count(ReadCall::PayoutNumerator), 2);
    }

    #[test]
    fn test_no_wins() {
        let chain = chain();
        chain.report_payouts(MM, &[1, 0]);

        let ConditionState::Resolved(resolution) = detect(&chain).unwrap() else {
            panic!("expected resolved");
        };
        assert_eq!(resolution.winner, Outcome::No);
    }

    #[test]
    fn test_tie_resolves_to_no_and_is_ambiguous() {
        let chain = chain();
        chain.report_payouts(MM, &[1, 1]);

        let ConditionState::Resolved(resolution) = detect(&chain).unwrap() else {
            panic!("expected resolved");
        };
        assert_eq!(resolution.winner, Outcome::No);
        assert!(resolution.is_ambiguous());
    }

    #[test]
    fn test_numerators_read_in_slot_order() {
        let chain = chain();
        chain.report_payouts(MM, &[3, 7]);

        detect(&chain).unwrap();
        assert_eq!(
            chain.calls(),
            vec![
                ReadCall::PayoutDenominator,
                ReadCall::OutcomeSlotCount,
                ReadCall::PayoutNumerator,
                ReadCall::PayoutNumerator,
            ]
        );
    }

    #[test]
    fn test_single_slot_is_malformed() {
        let chain = chain();
        chain.report_payouts(MM, &[1, 0]);
        chain.set_slot_count(MM, U256::from(1u8));

        assert!(matches!(detect(&chain), Err(ReadError::Malformed(_))));
        assert_eq!(chain.call_count(ReadCall::PayoutNumerator), 0);
    }

    #[test]
    fn test_oversized_slot_count_is_malformed() {
        let chain = chain();
        chain.report_payouts(MM, &[0, 1]);

        for slot_count in [
            U256::from(MAX_OUTCOME_SLOTS + 1),
            U256::from(u64::MAX),
            U256::MAX,
        ] {
            chain.set_slot_count(MM, slot_count);
            assert!(
                matches!(detect(&chain), Err(ReadError::Malformed(_))),
                "slot count {}",
                slot_count
            );
        }
        assert_eq!(chain.call_count(ReadCall::PayoutNumerator), 0);
    }

    #[test]
    fn test_numerator_failure_propagates() {
        let chain = chain();
        chain.report_payouts(MM, &[0, 1]);
        chain.fail(ReadCall::PayoutNumerator, ReadError::transport("timeout"));

        assert_eq!(detect(&chain), Err(ReadError::transport("timeout")));
    }
}
