//! Common types for bridge preparation and tracking
//!
//! Descriptors are built once by the preparers and handed to an external
//! signer; status snapshots are built fresh on every poll.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::address_codec::{ChainAddress, ChainTag, ContractPrincipal};
use crate::amount::MinorAmount;
use crate::stacks::post_conditions::{FungiblePostCondition, PostConditionMode};

// ============================================================================
// Network
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    pub fn is_mainnet(&self) -> bool {
        matches!(self, Network::Mainnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => f.write_str("mainnet"),
            Network::Testnet => f.write_str("testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(format!("Unknown network: {}", other)),
        }
    }
}

// ============================================================================
// Direction
// ============================================================================

/// Which way funds move across the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeDirection {
    /// Ethereum USDC → Stacks USDCx
    Deposit,
    /// Stacks USDCx → Ethereum USDC
    Withdrawal,
}

impl BridgeDirection {
    pub fn source_chain(&self) -> ChainTag {
        match self {
            BridgeDirection::Deposit => ChainTag::Ethereum,
            BridgeDirection::Withdrawal => ChainTag::Stacks,
        }
    }

    pub fn destination_chain(&self) -> ChainTag {
        match self {
            BridgeDirection::Deposit => ChainTag::Stacks,
            BridgeDirection::Withdrawal => ChainTag::Ethereum,
        }
    }

    /// Direction of a transaction broadcast on `chain`
    pub fn originating_on(chain: ChainTag) -> Self {
        match chain {
            ChainTag::Ethereum => BridgeDirection::Deposit,
            ChainTag::Stacks => BridgeDirection::Withdrawal,
        }
    }
}

impl fmt::Display for BridgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeDirection::Deposit => f.write_str("deposit"),
            BridgeDirection::Withdrawal => f.write_str("withdrawal"),
        }
    }
}

// ============================================================================
// Transaction Descriptor
// ============================================================================

/// Contract call the signer is asked to submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "chain", rename_all = "lowercase")]
pub enum CallTarget {
    Ethereum {
        contract: Address,
        function: String,
    },
    Stacks {
        contract: ContractPrincipal,
        function: String,
        /// Hex-serialized Clarity arguments
        function_args: Vec<String>,
    },
}

/// Where a gas figure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GasSource {
    /// `eth_estimateGas` with the real sender
    Estimated,
    /// Configured limit, used where estimation cannot succeed before approval
    Configured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeEstimate {
    EvmGas { gas_limit: u64, source: GasSource },
    StacksFee { micro_stx: u64 },
}

/// ERC-20 approval that must be signed before the deposit itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalStep {
    pub token: Address,
    pub spender: Address,
    pub amount: MinorAmount,
    pub payload: Bytes,
    pub gas_limit: u64,
}

/// Unsigned transaction handed to the user's wallet
///
/// Deliberately not `Clone`: a descriptor is built once and consumed by a
/// single signing request.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct TransactionDescriptor {
    direction: BridgeDirection,
    target: CallTarget,
    payload: Bytes,
    value_transferred: MinorAmount,
    fee_estimate: FeeEstimate,
    requires_approval: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    approval: Option<ApprovalStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_condition_mode: Option<PostConditionMode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    post_conditions: Vec<FungiblePostCondition>,
    /// Consensus encoding of each entry in `post_conditions`, same order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    encoded_post_conditions: Vec<Bytes>,
    recipient: ChainAddress,
    encoded_recipient: B256,
}

impl TransactionDescriptor {
    pub(crate) fn deposit(
        target: CallTarget,
        payload: Bytes,
        value_transferred: MinorAmount,
        fee_estimate: FeeEstimate,
        approval: Option<ApprovalStep>,
        recipient: ChainAddress,
        encoded_recipient: [u8; 32],
    ) -> Self {
        Self {
            direction: BridgeDirection::Deposit,
            target,
            payload,
            value_transferred,
            fee_estimate,
            requires_approval: approval.is_some(),
            approval,
            post_condition_mode: None,
            post_conditions: Vec::new(),
            encoded_post_conditions: Vec::new(),
            recipient,
            encoded_recipient: B256::from(encoded_recipient),
        }
    }

    pub(crate) fn withdrawal(
        target: CallTarget,
        payload: Bytes,
        value_transferred: MinorAmount,
        fee_estimate: FeeEstimate,
        post_condition: FungiblePostCondition,
        encoded_post_condition: Bytes,
        recipient: ChainAddress,
        encoded_recipient: [u8; 32],
    ) -> Self {
        Self {
            direction: BridgeDirection::Withdrawal,
            target,
            payload,
            value_transferred,
            fee_estimate,
            requires_approval: false,
            approval: None,
            post_condition_mode: Some(PostConditionMode::Deny),
            post_conditions: vec![post_condition],
            encoded_post_conditions: vec![encoded_post_condition],
            recipient,
            encoded_recipient: B256::from(encoded_recipient),
        }
    }

    pub fn direction(&self) -> BridgeDirection {
        self.direction
    }

    pub fn target(&self) -> &CallTarget {
        &self.target
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn value_transferred(&self) -> MinorAmount {
        self.value_transferred
    }

    pub fn fee_estimate(&self) -> FeeEstimate {
        self.fee_estimate
    }

    pub fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    pub fn approval(&self) -> Option<&ApprovalStep> {
        self.approval.as_ref()
    }

    pub fn post_condition_mode(&self) -> Option<PostConditionMode> {
        self.post_condition_mode
    }

    pub fn post_conditions(&self) -> &[FungiblePostCondition] {
        &self.post_conditions
    }

    pub fn encoded_post_conditions(&self) -> &[Bytes] {
        &self.encoded_post_conditions
    }

    pub fn recipient(&self) -> &ChainAddress {
        &self.recipient
    }

    pub fn encoded_recipient(&self) -> &B256 {
        &self.encoded_recipient
    }
}

// ============================================================================
// Status
// ============================================================================

/// Unified lifecycle of a bridge transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    /// Broadcast but not yet included
    Pending,
    /// Included, waiting for the source-chain confirmation threshold
    Confirming,
    /// Threshold reached, waiting for the external attestation service
    Attesting,
    /// Maximum attestation wait elapsed without a completion signal.
    /// An optimistic estimate, not a verified fact.
    PresumedCompleted,
    /// Completion confirmed by the caller's own evidence
    Completed,
    Failed,
}

impl BridgeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BridgeState::Completed | BridgeState::Failed)
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgeState::Pending => "pending",
            BridgeState::Confirming => "confirming",
            BridgeState::Attesting => "attesting",
            BridgeState::PresumedCompleted => "presumed_completed",
            BridgeState::Completed => "completed",
            BridgeState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Point-in-time status of one bridge transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
    pub tx_id: String,
    pub chain: ChainTag,
    pub direction: BridgeDirection,
    pub state: BridgeState,
    pub confirmations: u64,
    pub required_confirmations: u64,
    pub explorer_url: String,
    pub estimated_seconds_remaining: Option<u64>,
    pub failure_reason: Option<String>,
}
