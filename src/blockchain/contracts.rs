//! Solidity bindings for the liquidity bridge contract and the bridge precompile.

use alloy::sol;

sol! {
    /// Liquidity Bridge Contract (LBC).
    #[sol(rpc, all_derives)]
    interface LiquidityBridgeContract {
        /// Field order and widths are fixed by the deployed contract.
        struct Quote {
            bytes20 fedBtcAddress;
            address lbcAddress;
            address liquidityProviderRskAddress;
            bytes btcRefundAddress;
            address rskRefundAddress;
            bytes liquidityProviderBtcAddress;
            uint256 callFee;
            uint256 penaltyFee;
            address contractAddress;
            bytes data;
            uint256 gasLimit;
            uint256 nonce;
            uint256 value;
            uint256 agreementTimestamp;
            uint256 timeForDeposit;
            uint256 callTime;
            uint256 depositConfirmations;
        }

        function hashQuote(Quote memory quote) external view returns (bytes32);

        function callForUser(Quote memory quote) external payable returns (bool);

        function registerPegIn(
            Quote memory quote,
            bytes memory signature,
            bytes memory btcRawTransaction,
            bytes memory partialMerkleTree,
            uint256 height
        ) external returns (int256);
    }
}

sol! {
    /// Federation reads exposed by the bridge precompile.
    #[sol(rpc)]
    interface RskBridge {
        function getFederationSize() external view returns (int256);

        function getFederationThreshold() external view returns (int256);

        function getFederatorPublicKeyOfType(int256 index, string calldata atype) external view returns (bytes memory);

        function getFederationAddress() external view returns (string memory);

        function getActiveFederationCreationBlockHeight() external view returns (uint256);
    }
}

/// The LBC call struct as generated by the bindings.
pub type OnChainQuote = LiquidityBridgeContract::Quote;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    #[test]
    fn test_quote_struct_is_comparable_and_printable() {
        let quote = OnChainQuote {
            nonce: U256::from(7u64),
            ..Default::default()
        };
        assert_eq!(quote.clone(), quote);
        assert_ne!(quote, OnChainQuote::default());
        assert!(format!("{:?}", quote).contains("nonce"));
    }
}
