//! Lending contract interface.
//!
//! Only the surface the keeper touches: two views for scanning and the
//! liquidation entry point. Custom errors are declared so their selectors can
//! be recognised in revert data.

use alloy::sol;

sol! {
    /// Loan record as stored by the lending contract.
    #[derive(Debug)]
    struct Loan {
        uint256 id;
        uint256 collateralId;
        address borrower;
        address lender;
        uint256 principal;
        uint256 fundingTimestamp;
        uint256 dueTimestamp;
        uint256 termMonths;
        uint8 status;
    }

    /// Lending protocol contract interface
    #[sol(rpc)]
    interface ILendingProtocol {
        error LoanNotActive(uint256 loanId);
        error LoanNotOverdue(uint256 loanId);
        error LoanDoesNotExist(uint256 loanId);

        event LoanLiquidated(uint256 indexed loanId, address indexed liquidator);

        function getLoanCount() external view returns (uint256);
        function getLoan(uint256 loanId) external view returns (Loan memory);
        function liquidateLoan(uint256 loanId) external;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use alloy::sol_types::{SolCall, SolError, SolEvent};

    #[test]
    fn test_liquidate_calldata_layout() {
        let call = ILendingProtocol::liquidateLoanCall {
            loanId: U256::from(7u64),
        };
        let encoded = call.abi_encode();

        assert_eq!(encoded.len(), 4 + 32);
        assert_eq!(&encoded[..4], ILendingProtocol::liquidateLoanCall::SELECTOR.as_slice());
        assert_eq!(encoded[35], 7);
    }

    #[test]
    fn test_error_selectors_are_distinct() {
        let selectors = [
            ILendingProtocol::LoanNotActive::SELECTOR,
            ILendingProtocol::LoanNotOverdue::SELECTOR,
            ILendingProtocol::LoanDoesNotExist::SELECTOR,
        ];
        assert_ne!(selectors[0], selectors[1]);
        assert_ne!(selectors[1], selectors[2]);
        assert_ne!(selectors[0], selectors[2]);
    }

    #[test]
    fn test_liquidated_event_signature() {
        assert_eq!(
            ILendingProtocol::LoanLiquidated::SIGNATURE,
            "LoanLiquidated(uint256,address)"
        );
    }
}
