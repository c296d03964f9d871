//! EVM contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the USDC token
//! and the xReserve bridge contract.

use alloy::sol;

sol! {
    // ========================================================================
    // ERC20 Interface for token operations
    // ========================================================================

    /// Subset of ERC20 used for allowance sequencing and balance reads
    #[sol(rpc)]
    contract ERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }

    // ========================================================================
    // xReserve Bridge Contract
    // ========================================================================

    /// xReserve - locks USDC on Ethereum for minting on a remote domain
    #[sol(rpc)]
    contract XReserve {
        /// Deposit `value` of `localToken` for `remoteRecipient` on `remoteDomain`.
        /// `maxFee` caps the fee the attestation path may deduct.
        function depositToRemote(
            uint256 value,
            uint32 remoteDomain,
            bytes32 remoteRecipient,
            address localToken,
            uint256 maxFee,
            bytes calldata hookData
        ) external;
    }
}
