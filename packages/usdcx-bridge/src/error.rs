//! Error taxonomy for bridge preparation and status tracking
//!
//! Every failure crossing the library boundary is one of these typed values.
//! User-input problems (`AddressFormatError`, `InvalidAmountError`,
//! `BelowMinimumError`) are recoverable by re-entry; dependency problems
//! (`EstimationError`, `ChainQueryError`) are recoverable by retry at the
//! caller's discretion.

use std::time::Duration;

use thiserror::Error;

use crate::address_codec::ChainTag;
use crate::amount::MinorAmount;
use crate::types::{BridgeDirection, BridgeState};

/// Malformed, checksum-invalid or wrong-chain address input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressFormatError {
    #[error("Address is empty")]
    Empty,

    #[error("Invalid address length: expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Invalid character '{0}' in address")]
    InvalidCharacter(char),

    #[error("Invalid address prefix: {0}")]
    InvalidPrefix(String),

    #[error("Address checksum mismatch")]
    ChecksumMismatch,

    #[error("Unsupported address version: {0}")]
    UnsupportedVersion(u8),

    #[error("Address is not in canonical form, expected {canonical}")]
    NonCanonical { canonical: String },

    #[error("Refusing to use the zero address")]
    ZeroAddress,

    #[error("Non-zero padding bytes in 32-byte address")]
    NonZeroPadding,

    #[error("Expected a {expected} address, got a {got} address")]
    WrongChain { expected: ChainTag, got: ChainTag },

    #[error("Address {address} belongs to {actual}, bridge is configured for {expected}")]
    NetworkMismatch {
        address: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid contract identifier: {0}")]
    InvalidContractId(String),
}

/// Amount string that is not a positive decimal within the supported precision
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidAmountError {
    #[error("Amount is empty")]
    Empty,

    #[error("Amount is not a decimal number: {0}")]
    Malformed(String),

    #[error("Amount has {got} fractional digits, at most {max} are supported")]
    TooManyFractionalDigits { max: u8, got: usize },

    #[error("Amount must be greater than zero")]
    NotPositive,

    #[error("Amount is too large")]
    Overflow,
}

/// Amount below the configured minimum for its direction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{direction} amount {amount} is below the minimum of {minimum}")]
pub struct BelowMinimumError {
    pub direction: BridgeDirection,
    pub amount: MinorAmount,
    pub minimum: MinorAmount,
}

/// Gas or fee estimation failed; never replaced by a silent default
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Gas estimation failed: {reason}")]
pub struct EstimationError {
    pub reason: String,
}

/// A read against one of the chains failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainQueryError {
    #[error("{chain} query failed: {message}")]
    Rpc { chain: ChainTag, message: String },

    #[error("{chain} query timed out after {after:?}")]
    Timeout { chain: ChainTag, after: Duration },

    #[error("{chain} returned an unexpected response: {message}")]
    Malformed { chain: ChainTag, message: String },
}

impl ChainQueryError {
    pub fn rpc(chain: ChainTag, message: impl Into<String>) -> Self {
        Self::Rpc {
            chain,
            message: message.into(),
        }
    }

    pub fn malformed(chain: ChainTag, message: impl Into<String>) -> Self {
        Self::Malformed {
            chain,
            message: message.into(),
        }
    }
}

/// Status tracking anomalies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    /// Confirmation count went down between polls (reorg or lagging node)
    #[error(
        "Confirmation count for {tx_id} regressed from {previous} to {observed}"
    )]
    AnomalousStateRegression {
        tx_id: String,
        previous: u64,
        observed: u64,
    },

    #[error("Cannot move {tx_id} from {from} to {to}")]
    InvalidTransition {
        tx_id: String,
        from: BridgeState,
        to: BridgeState,
    },

    #[error("Snapshot for {snapshot} does not belong to {requested}")]
    SnapshotMismatch { snapshot: String, requested: String },

    #[error("Invalid transaction id: {0}")]
    InvalidTransactionId(String),
}

/// Top-level error returned by the exposed bridge operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error(transparent)]
    AddressFormat(#[from] AddressFormatError),

    #[error(transparent)]
    InvalidAmount(#[from] InvalidAmountError),

    #[error(transparent)]
    BelowMinimum(#[from] BelowMinimumError),

    #[error(transparent)]
    Estimation(#[from] EstimationError),

    #[error(transparent)]
    ChainQuery(#[from] ChainQueryError),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("Insufficient balance: {available} available, {required} required")]
    InsufficientBalance {
        available: MinorAmount,
        required: MinorAmount,
    },
}

impl BridgeError {
    /// Whether the caller should ask the user to correct their input
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            BridgeError::AddressFormat(_)
                | BridgeError::InvalidAmount(_)
                | BridgeError::BelowMinimum(_)
                | BridgeError::InsufficientBalance { .. }
        )
    }

    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::Estimation(_) | BridgeError::ChainQuery(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err: BridgeError = InvalidAmountError::NotPositive.into();
        assert!(err.is_user_correctable());
        assert!(!err.is_retryable());

        let err: BridgeError = ChainQueryError::rpc(ChainTag::Stacks, "503").into();
        assert!(err.is_retryable());
        assert!(!err.is_user_correctable());

        let err: BridgeError = StatusError::AnomalousStateRegression {
            tx_id: "0xab".to_string(),
            previous: 5,
            observed: 2,
        }
        .into();
        assert!(!err.is_retryable());
        assert!(!err.is_user_correctable());
    }

    #[test]
    fn test_below_minimum_message() {
        let err = BelowMinimumError {
            direction: BridgeDirection::Withdrawal,
            amount: MinorAmount::new(4_790_000),
            minimum: MinorAmount::new(4_800_000),
        };
        assert_eq!(
            err.to_string(),
            "withdrawal amount 4.79 is below the minimum of 4.80"
        );
    }
}
