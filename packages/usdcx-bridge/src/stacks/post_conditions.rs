//! Stacks post-conditions
//!
//! A withdrawal burns USDCx, so the signer's transaction carries a
//! fungible-token post-condition pinning the exact amount that may leave the
//! sender's account. With post-condition mode `deny`, any other asset
//! movement aborts the transaction.

use serde::Serialize;

use crate::address_codec::{ContractPrincipal, StacksAddress};
use crate::amount::MinorAmount;
use crate::error::InvalidAmountError;
use crate::stacks::clarity::push_short_string;

const POST_CONDITION_TYPE_FUNGIBLE: u8 = 0x01;
const PRINCIPAL_TYPE_STANDARD: u8 = 0x02;

/// Withdrawals run in `deny` mode: unlisted asset movements abort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostConditionMode {
    Deny,
}

/// Withdrawals only ever pin an exact amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FungibleConditionCode {
    SentEq,
}

impl FungibleConditionCode {
    pub fn to_byte(&self) -> u8 {
        match self {
            FungibleConditionCode::SentEq => 0x01,
        }
    }
}

/// Assertion that `principal` sends `amount` of `asset` under `condition`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FungiblePostCondition {
    pub principal: StacksAddress,
    pub asset_contract: ContractPrincipal,
    pub asset_name: String,
    pub condition: FungibleConditionCode,
    pub amount: MinorAmount,
}

impl FungiblePostCondition {
    /// `sender` sends exactly `amount`
    ///
    /// Fails when the amount does not fit the 64-bit post-condition field.
    pub fn sent_exactly(
        sender: StacksAddress,
        asset_contract: ContractPrincipal,
        asset_name: &str,
        amount: MinorAmount,
    ) -> Result<Self, InvalidAmountError> {
        amount.to_u64()?;
        Ok(Self {
            principal: sender,
            asset_contract,
            asset_name: asset_name.to_string(),
            condition: FungibleConditionCode::SentEq,
            amount,
        })
    }

    pub fn asset_identifier(&self) -> String {
        self.asset_contract.asset_identifier(&self.asset_name)
    }

    /// Layout: | 0x01 | 0x02 | version | hash160 | asset address (21) |
    /// contract name | asset name | condition (1) | amount (8, big-endian) |
    pub fn serialize(&self) -> Result<Vec<u8>, InvalidAmountError> {
        let amount = self.amount.to_u64()?;

        let mut out = vec![POST_CONDITION_TYPE_FUNGIBLE, PRINCIPAL_TYPE_STANDARD];
        out.extend_from_slice(&self.principal.to_consensus_bytes());
        out.extend_from_slice(&self.asset_contract.address.to_consensus_bytes());
        push_short_string(&mut out, &self.asset_contract.name);
        push_short_string(&mut out, &self.asset_name);
        out.push(self.condition.to_byte());
        out.extend_from_slice(&amount.to_be_bytes());
        Ok(out)
    }
}
