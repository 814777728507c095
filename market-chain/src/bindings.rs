//! Solidity interface bindings
//!
//! Only the functions the client reads (plus the oracle trigger) are
//! declared. `#[sol(rpc)]` generates a contract instance type for each
//! interface, e.g. `ILMSRMarketMaker::new(address, provider)`.

use alloy::sol;

sol! {
    /// LMSR automated market maker
    #[sol(rpc)]
    interface ILMSRMarketMaker {
        function pmSystem() external view returns (address);
        function collateralToken() external view returns (address);
        function conditionIds(uint256 index) external view returns (bytes32);
        function funding() external view returns (uint256);
        function stage() external view returns (uint8);
        function calcMarginalPrice(uint8 outcomeIndex) external view returns (uint256);
    }
}

sol! {
    /// Conditional tokens framework (outcome positions and payout reporting)
    #[sol(rpc)]
    interface IConditionalTokens {
        function payoutDenominator(bytes32 conditionId) external view returns (uint256);
        function getOutcomeSlotCount(bytes32 conditionId) external view returns (uint256);
        function payoutNumerators(bytes32 conditionId, uint256 index) external view returns (uint256);
        function getCollectionId(bytes32 parentCollectionId, bytes32 conditionId, uint256 indexSet) external view returns (bytes32);
        function getPositionId(address collateralToken, bytes32 collectionId) external pure returns (uint256);
        function balanceOf(address owner, uint256 positionId) external view returns (uint256);
    }
}

sol! {
    /// Collateral token
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function symbol() external view returns (string);
    }
}

sol! {
    /// Oracle controller that asks the off-chain oracle to resolve a market
    #[sol(rpc)]
    interface IOracleController {
        function addTrigger() external payable returns (uint64 triggerId);

        event NewTrigger(bytes triggerInfo);
    }

    /// Payload of `NewTrigger`
    #[derive(Debug)]
    struct TriggerInfo {
        uint64 triggerId;
        address creator;
        bytes data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::{SolCall, SolEvent};

    #[test]
    fn test_erc20_selectors() {
        // balanceOf(address), decimals(), symbol()
        assert_eq!(IERC20::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(IERC20::decimalsCall::SELECTOR, [0x31, 0x3c, 0xe5, 0x67]);
        assert_eq!(IERC20::symbolCall::SELECTOR, [0x95, 0xd8, 0x9b, 0x41]);
    }

    #[test]
    fn test_signatures() {
        assert_eq!(
            ILMSRMarketMaker::calcMarginalPriceCall::SIGNATURE,
            "calcMarginalPrice(uint8)"
        );
        assert_eq!(
            IConditionalTokens::payoutNumeratorsCall::SIGNATURE,
            "payoutNumerators(bytes32,uint256)"
        );
        assert_eq!(
            IConditionalTokens::balanceOfCall::SIGNATURE,
            "balanceOf(address,uint256)"
        );
        assert_eq!(IOracleController::NewTrigger::SIGNATURE, "NewTrigger(bytes)");
    }
}
