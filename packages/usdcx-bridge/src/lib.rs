//! USDCx Bridge: Transaction Preparation and Tracking for Ethereum ⇄ Stacks
//!
//! This crate turns a user-stated amount and destination into an unsigned
//! transaction descriptor for the user's own wallet, then tracks the signed
//! transaction until completion or failure:
//!
//! - **Address Codec** - c32check / EIP-55 parsing and the 32-byte layouts each bridge contract expects
//! - **Amounts** - Decimal string ⇄ minor units, per-direction minimums
//! - **Deposit** - ERC-20 allowance sequencing and `depositToRemote` calldata
//! - **Withdrawal** - Clarity `burn` call with an exact-amount post-condition
//! - **Status** - Confirmation / attestation state machine with ETA
//! - **Balances** - USDC and USDCx reads that never disguise a failure as zero
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! usdcx-bridge = { path = "../usdcx-bridge" }
//! ```
//!
//! ## Feature Flags
//!
//! - `testing` - Enable the in-memory chain query and fixtures for downstream tests

// Core modules
pub mod address_codec;
pub mod amount;
pub mod config;
pub mod error;
pub mod explorer;
pub mod redact;
pub mod types;

// Chain adapters
pub mod evm;
pub mod query;
pub mod stacks;

// Operations
pub mod balance;
pub mod bridge;
pub mod deposit;
pub mod status;
pub mod withdrawal;

// Testing utilities (feature-gated)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used items at the crate root
pub use address_codec::{
    decode, encode, evm_address_from_bytes32, evm_address_to_bytes32, parse_evm_address, validate,
    ChainAddress, ChainTag, ContractPrincipal, StacksAddress,
};
pub use amount::{to_decimal_string, to_minor_units, AmountPolicy, MinorAmount, USDC_DECIMALS};
pub use balance::{BalanceReader, BalanceReading, Balances};
pub use bridge::UsdcxBridge;
pub use config::{BridgeConfig, ConfirmationPolicy};
pub use deposit::DepositPreparer;
pub use error::{
    AddressFormatError, BelowMinimumError, BridgeError, ChainQueryError, EstimationError,
    InvalidAmountError, StatusError,
};
pub use explorer::explorer_tx_url;
pub use query::{ChainQuery, EvmCall, RpcChainQuery};
pub use status::{normalize_tx_id, StatusTracker};
pub use types::{
    ApprovalStep, BridgeDirection, BridgeState, CallTarget, FeeEstimate, GasSource, Network,
    TransactionDescriptor, TransactionStatus,
};
pub use withdrawal::WithdrawalPreparer;
