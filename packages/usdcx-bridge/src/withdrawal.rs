//! Withdrawal preparation (Stacks USDCx → Ethereum USDC)
//!
//! Builds the unsigned `burn` contract call. No allowance exists on Stacks;
//! instead the descriptor carries a deny-mode post-condition pinning the
//! exact amount leaving the sender.

use std::sync::Arc;

use alloy::primitives::Bytes;
use tracing::{debug, info, warn};

use crate::address_codec::{evm_address_to_bytes32, ChainAddress};
use crate::amount::MinorAmount;
use crate::config::BridgeConfig;
use crate::error::{AddressFormatError, BridgeError};
use crate::query::ChainQuery;
use crate::stacks::{ClarityValue, ContractCall, FungiblePostCondition};
use crate::types::{BridgeDirection, CallTarget, FeeEstimate, TransactionDescriptor};

const BURN_FUNCTION: &str = "burn";

pub struct WithdrawalPreparer<Q: ChainQuery> {
    config: Arc<BridgeConfig>,
    query: Arc<Q>,
}

impl<Q: ChainQuery> WithdrawalPreparer<Q> {
    pub fn new(config: Arc<BridgeConfig>, query: Arc<Q>) -> Self {
        Self { config, query }
    }

    /// Build the withdrawal descriptor
    ///
    /// Calls `burn(amount, native-domain, native-recipient)` where
    /// `native-recipient` is the Ethereum address right-padded to 32 bytes.
    pub async fn prepare(
        &self,
        amount: MinorAmount,
        destination: &ChainAddress,
        source: &ChainAddress,
    ) -> Result<TransactionDescriptor, BridgeError> {
        self.config
            .amounts
            .enforce_minimum(amount, BridgeDirection::Withdrawal)?;

        let recipient = *destination.as_ethereum()?;
        if recipient.is_zero() {
            return Err(AddressFormatError::ZeroAddress.into());
        }
        let sender = *source.as_stacks()?;
        sender.ensure_network(self.config.network)?;

        let stacks = &self.config.stacks;
        let post_condition = FungiblePostCondition::sent_exactly(
            sender,
            stacks.token_contract.clone(),
            &stacks.token_asset_name,
            amount,
        )?;
        let encoded_post_condition = Bytes::from(post_condition.serialize()?);

        let asset = stacks.token_asset_identifier();
        let available = MinorAmount::new(
            self.query
                .stacks_token_balance(&sender.to_string(), &asset)
                .await?,
        );
        debug!(sender = %sender, balance = %available, "Read USDCx balance");
        if available < amount {
            warn!(
                sender = %sender,
                available = %available,
                required = %amount,
                "Insufficient USDCx for withdrawal"
            );
            return Err(BridgeError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        let encoded_recipient = evm_address_to_bytes32(&recipient);
        let call = ContractCall::new(
            stacks.bridge_contract.clone(),
            BURN_FUNCTION,
            vec![
                ClarityValue::Uint(amount.units()),
                ClarityValue::Uint(u128::from(self.config.domains.ethereum)),
                ClarityValue::Buffer(encoded_recipient.to_vec()),
            ],
        );

        info!(
            amount = %amount,
            recipient = %recipient,
            sender = %sender,
            "Prepared withdrawal"
        );

        Ok(TransactionDescriptor::withdrawal(
            CallTarget::Stacks {
                contract: call.contract.clone(),
                function: call.function_name.clone(),
                function_args: call.args_hex(),
            },
            Bytes::from(call.encode_payload()),
            amount,
            FeeEstimate::StacksFee {
                micro_stx: stacks.withdrawal_fee_ustx,
            },
            post_condition,
            encoded_post_condition,
            *destination,
            encoded_recipient,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_codec::ChainTag;
    use crate::error::ChainQueryError;
    use crate::stacks::{FungibleConditionCode, PostConditionMode};
    use crate::testing::{fixtures, MockChainQuery};

    fn preparer(
        query: MockChainQuery,
    ) -> (WithdrawalPreparer<MockChainQuery>, Arc<MockChainQuery>) {
        let query = Arc::new(query);
        let preparer =
            WithdrawalPreparer::new(Arc::new(fixtures::testnet_config()), query.clone());
        (preparer, query)
    }

    fn destination() -> ChainAddress {
        ChainAddress::parse(fixtures::EVM_USER, ChainTag::Ethereum).unwrap()
    }

    fn source() -> ChainAddress {
        ChainAddress::parse(fixtures::STACKS_TESTNET_USER, ChainTag::Stacks).unwrap()
    }

    #[tokio::test]
    async fn test_minimum_is_accepted() {
        let (preparer, _) = preparer(MockChainQuery::new().with_stacks_balance(100_000_000));
        let descriptor = preparer
            .prepare(MinorAmount::new(4_800_000), &destination(), &source())
            .await
            .unwrap();
        assert_eq!(descriptor.value_transferred(), MinorAmount::new(4_800_000));
    }

    #[tokio::test]
    async fn test_below_minimum_makes_no_calls() {
        let (preparer, query) = preparer(MockChainQuery::new().with_stacks_balance(100_000_000));
        let err = preparer
            .prepare(MinorAmount::new(4_790_000), &destination(), &source())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::BelowMinimum(_)));
        assert_eq!(query.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_descriptor_carries_exact_post_condition() {
        let (preparer, _) = preparer(MockChainQuery::new().with_stacks_balance(5_000_000));
        let descriptor = preparer
            .prepare(MinorAmount::new(5_000_000), &destination(), &source())
            .await
            .unwrap();

        assert!(!descriptor.requires_approval());
        assert_eq!(descriptor.post_condition_mode(), Some(PostConditionMode::Deny));
        let conditions = descriptor.post_conditions();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].amount, MinorAmount::new(5_000_000));
        assert_eq!(conditions[0].condition, FungibleConditionCode::SentEq);
        assert_eq!(conditions[0].principal.to_string(), fixtures::STACKS_TESTNET_USER);
        assert_eq!(
            conditions[0].asset_identifier(),
            format!("{}::usdcx-token", fixtures::TOKEN_CONTRACT)
        );
        assert_eq!(
            descriptor.fee_estimate(),
            FeeEstimate::StacksFee { micro_stx: 10_000 }
        );

        let encoded = descriptor.encoded_post_conditions();
        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded[0].to_vec(), conditions[0].serialize().unwrap());
        // sent-eq code followed by the u64 amount
        let tail = &encoded[0][encoded[0].len() - 9..];
        assert_eq!(tail[0], 0x01);
        assert_eq!(&tail[1..], &5_000_000u64.to_be_bytes());
    }

    #[tokio::test]
    async fn test_burn_arguments() {
        let (preparer, _) = preparer(MockChainQuery::new().with_stacks_balance(u128::MAX));
        let descriptor = preparer
            .prepare(MinorAmount::new(5_000_000), &destination(), &source())
            .await
            .unwrap();

        let CallTarget::Stacks {
            contract,
            function,
            function_args,
        } = descriptor.target()
        else {
            panic!("expected a Stacks call target");
        };
        assert_eq!(contract.to_string(), fixtures::BRIDGE_CONTRACT);
        assert_eq!(function, "burn");
        assert_eq!(function_args.len(), 3);
        assert_eq!(function_args[0], ClarityValue::Uint(5_000_000).to_hex());
        assert_eq!(function_args[1], ClarityValue::Uint(0).to_hex());

        // | address (20) | zero (12) |
        let recipient = descriptor.encoded_recipient();
        assert_eq!(&recipient[..20], fixtures::evm_user().as_slice());
        assert!(recipient[20..].iter().all(|b| *b == 0));
        assert_eq!(
            function_args[2],
            ClarityValue::Buffer(recipient.to_vec()).to_hex()
        );
    }

    #[tokio::test]
    async fn test_insufficient_balance() {
        let (preparer, _) = preparer(MockChainQuery::new().with_stacks_balance(4_999_999));
        let err = preparer
            .prepare(MinorAmount::new(5_000_000), &destination(), &source())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BridgeError::InsufficientBalance {
                available: MinorAmount::new(4_999_999),
                required: MinorAmount::new(5_000_000),
            }
        );
        assert!(err.is_user_correctable());
    }

    #[tokio::test]
    async fn test_balance_query_failure_propagates() {
        let (preparer, _) =
            preparer(MockChainQuery::new().with_stacks_balance_error("502 Bad Gateway"));
        let err = preparer
            .prepare(MinorAmount::new(5_000_000), &destination(), &source())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BridgeError::ChainQuery(ChainQueryError::Rpc {
                chain: ChainTag::Stacks,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_rejects_zero_recipient() {
        let (preparer, query) = preparer(MockChainQuery::new().with_stacks_balance(u128::MAX));
        let zero = ChainAddress::Ethereum(alloy::primitives::Address::ZERO);
        let err = preparer
            .prepare(MinorAmount::new(5_000_000), &zero, &source())
            .await
            .unwrap_err();

        assert_eq!(err, BridgeError::AddressFormat(AddressFormatError::ZeroAddress));
        assert_eq!(query.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejects_mainnet_sender_on_testnet() {
        let (preparer, _) = preparer(MockChainQuery::new().with_stacks_balance(u128::MAX));
        let mainnet = ChainAddress::parse(fixtures::STACKS_MAINNET_USER, ChainTag::Stacks).unwrap();
        let err = preparer
            .prepare(MinorAmount::new(5_000_000), &destination(), &mainnet)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BridgeError::AddressFormat(AddressFormatError::NetworkMismatch { .. })
        ));
    }
}
