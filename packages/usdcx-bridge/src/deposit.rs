//! Deposit preparation (Ethereum USDC → Stacks USDCx)
//!
//! Builds the unsigned `depositToRemote` call plus, when the sender's
//! allowance does not already cover the amount, the ERC-20 approval that
//! must be signed first.

use std::sync::Arc;

use alloy::primitives::{Bytes, B256, U256};
use alloy::sol_types::SolCall;
use tracing::{debug, info};

use crate::address_codec::ChainAddress;
use crate::amount::MinorAmount;
use crate::config::BridgeConfig;
use crate::error::{AddressFormatError, BridgeError};
use crate::evm::{XReserve, ERC20};
use crate::query::{ChainQuery, EvmCall};
use crate::types::{
    ApprovalStep, BridgeDirection, CallTarget, FeeEstimate, GasSource, TransactionDescriptor,
};

const DEPOSIT_FUNCTION: &str = "depositToRemote";

/// Prepares deposit descriptors against a [`ChainQuery`]
pub struct DepositPreparer<Q: ChainQuery> {
    config: Arc<BridgeConfig>,
    query: Arc<Q>,
}

impl<Q: ChainQuery> DepositPreparer<Q> {
    pub fn new(config: Arc<BridgeConfig>, query: Arc<Q>) -> Self {
        Self { config, query }
    }

    /// Build the deposit descriptor
    ///
    /// The minimum is enforced before any network call. The descriptor's
    /// `requires_approval` is set iff the current allowance is strictly
    /// less than `amount`; the approval covers exactly `amount`.
    pub async fn prepare(
        &self,
        amount: MinorAmount,
        destination: &ChainAddress,
        source: &ChainAddress,
    ) -> Result<TransactionDescriptor, BridgeError> {
        self.config
            .amounts
            .enforce_minimum(amount, BridgeDirection::Deposit)?;

        let recipient = destination.as_stacks()?;
        recipient.ensure_network(self.config.network)?;
        let sender = *source.as_ethereum()?;
        if sender.is_zero() {
            return Err(AddressFormatError::ZeroAddress.into());
        }

        let evm = &self.config.evm;
        let encoded_recipient = destination.to_bytes32();
        let value = U256::from(amount.units());

        let allowance = self
            .query
            .erc20_allowance(evm.usdc_address, sender, evm.xreserve_address)
            .await?;
        debug!(
            sender = %sender,
            allowance = %allowance,
            amount = %amount,
            "Read USDC allowance"
        );

        let payload: Bytes = XReserve::depositToRemoteCall {
            value,
            remoteDomain: self.config.domains.stacks,
            remoteRecipient: B256::from(encoded_recipient),
            localToken: evm.usdc_address,
            maxFee: U256::from(evm.deposit_max_fee.units()),
            hookData: Bytes::new(),
        }
        .abi_encode()
        .into();

        let (approval, fee_estimate) = if allowance < value {
            let approve_payload: Bytes = ERC20::approveCall {
                spender: evm.xreserve_address,
                amount: value,
            }
            .abi_encode()
            .into();

            let approve_gas = self
                .query
                .estimate_gas(&EvmCall {
                    from: sender,
                    to: evm.usdc_address,
                    input: approve_payload.clone(),
                })
                .await?;

            // The deposit reverts in simulation until the approval lands
            let approval = ApprovalStep {
                token: evm.usdc_address,
                spender: evm.xreserve_address,
                amount,
                payload: approve_payload,
                gas_limit: approve_gas,
            };
            let fee = FeeEstimate::EvmGas {
                gas_limit: evm.deposit_gas_limit,
                source: GasSource::Configured,
            };
            (Some(approval), fee)
        } else {
            let gas_limit = self
                .query
                .estimate_gas(&EvmCall {
                    from: sender,
                    to: evm.xreserve_address,
                    input: payload.clone(),
                })
                .await?;
            let fee = FeeEstimate::EvmGas {
                gas_limit,
                source: GasSource::Estimated,
            };
            (None, fee)
        };

        info!(
            amount = %amount,
            recipient = %recipient,
            requires_approval = approval.is_some(),
            "Prepared deposit"
        );

        Ok(TransactionDescriptor::deposit(
            CallTarget::Ethereum {
                contract: evm.xreserve_address,
                function: DEPOSIT_FUNCTION.to_string(),
            },
            payload,
            amount,
            fee_estimate,
            approval,
            *destination,
            encoded_recipient,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_codec::ChainTag;
    use crate::error::{BelowMinimumError, EstimationError};
    use crate::testing::{fixtures, MockChainQuery};

    fn preparer(query: MockChainQuery) -> (DepositPreparer<MockChainQuery>, Arc<MockChainQuery>) {
        let query = Arc::new(query);
        let preparer = DepositPreparer::new(Arc::new(fixtures::testnet_config()), query.clone());
        (preparer, query)
    }

    fn destination() -> ChainAddress {
        ChainAddress::parse(fixtures::STACKS_TESTNET_OTHER, ChainTag::Stacks).unwrap()
    }

    fn source() -> ChainAddress {
        ChainAddress::parse(fixtures::EVM_USER, ChainTag::Ethereum).unwrap()
    }

    #[tokio::test]
    async fn test_below_minimum_makes_no_calls() {
        let (preparer, query) = preparer(MockChainQuery::new());
        let err = preparer
            .prepare(MinorAmount::new(999_999), &destination(), &source())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::BelowMinimum(BelowMinimumError { .. })));
        assert_eq!(query.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_exact_allowance_needs_no_approval() {
        let (preparer, query) = preparer(
            MockChainQuery::new()
                .with_allowance(5_000_000)
                .with_gas(90_000),
        );
        let descriptor = preparer
            .prepare(MinorAmount::new(5_000_000), &destination(), &source())
            .await
            .unwrap();

        assert!(!descriptor.requires_approval());
        assert!(descriptor.approval().is_none());
        assert_eq!(
            descriptor.fee_estimate(),
            FeeEstimate::EvmGas {
                gas_limit: 90_000,
                source: GasSource::Estimated
            }
        );

        let estimated = query.estimated_calls();
        assert_eq!(estimated.len(), 1);
        assert_eq!(estimated[0].from, fixtures::evm_user());
        assert_eq!(estimated[0].to, fixtures::XRESERVE_ADDRESS);
        assert_eq!(&estimated[0].input, descriptor.payload());
    }

    #[tokio::test]
    async fn test_short_allowance_requires_exact_approval() {
        let (preparer, query) = preparer(
            MockChainQuery::new()
                .with_allowance(4_999_999)
                .with_gas(46_000),
        );
        let descriptor = preparer
            .prepare(MinorAmount::new(5_000_000), &destination(), &source())
            .await
            .unwrap();

        assert!(descriptor.requires_approval());
        let approval = descriptor.approval().unwrap();
        assert_eq!(approval.amount, MinorAmount::new(5_000_000));
        assert_eq!(approval.spender, fixtures::XRESERVE_ADDRESS);
        assert_eq!(approval.gas_limit, 46_000);

        let decoded = ERC20::approveCall::abi_decode(&approval.payload, true).unwrap();
        assert_eq!(decoded.amount, U256::from(5_000_000u64));

        assert_eq!(
            descriptor.fee_estimate(),
            FeeEstimate::EvmGas {
                gas_limit: 150_000,
                source: GasSource::Configured
            }
        );
        assert_eq!(query.estimated_calls()[0].to, fixtures::USDC_ADDRESS);
    }

    #[tokio::test]
    async fn test_payload_encodes_recipient_and_domain() {
        let (preparer, _) = preparer(MockChainQuery::new().with_allowance(u128::MAX));
        let descriptor = preparer
            .prepare(MinorAmount::new(1_000_000), &destination(), &source())
            .await
            .unwrap();

        let call = XReserve::depositToRemoteCall::abi_decode(descriptor.payload(), true).unwrap();
        assert_eq!(call.value, U256::from(1_000_000u64));
        assert_eq!(call.remoteDomain, 10003);
        assert_eq!(call.remoteRecipient, *descriptor.encoded_recipient());
        assert_eq!(call.localToken, fixtures::USDC_ADDRESS);
        assert!(call.hookData.is_empty());

        // | zero (11) | version 26 | hash160 |
        let recipient = descriptor.encoded_recipient();
        assert!(recipient[..11].iter().all(|b| *b == 0));
        assert_eq!(recipient[11], 26);
        assert_eq!(descriptor.direction(), BridgeDirection::Deposit);
    }

    #[tokio::test]
    async fn test_estimation_failure_propagates() {
        let (preparer, _) = preparer(
            MockChainQuery::new()
                .with_allowance(u128::MAX)
                .with_gas_error("execution reverted"),
        );
        let err = preparer
            .prepare(MinorAmount::new(2_000_000), &destination(), &source())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BridgeError::Estimation(EstimationError {
                reason: "execution reverted".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_rejects_mainnet_recipient_on_testnet() {
        let (preparer, query) = preparer(MockChainQuery::new());
        let mainnet = ChainAddress::parse(fixtures::STACKS_MAINNET_USER, ChainTag::Stacks).unwrap();
        let err = preparer
            .prepare(MinorAmount::new(2_000_000), &mainnet, &source())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BridgeError::AddressFormat(AddressFormatError::NetworkMismatch { .. })
        ));
        assert_eq!(query.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejects_swapped_addresses() {
        let (preparer, _) = preparer(MockChainQuery::new());
        let err = preparer
            .prepare(MinorAmount::new(2_000_000), &source(), &destination())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BridgeError::AddressFormat(AddressFormatError::WrongChain { .. })
        ));
    }
}
