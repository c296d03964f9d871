//! Balance reads on both chains
//!
//! A failed read is reported as [`BalanceReading::Unknown`], never as zero.

use std::sync::Arc;

use alloy::primitives::U256;
use serde::Serialize;
use tracing::warn;

use crate::address_codec::ChainAddress;
use crate::amount::{to_decimal_string, MinorAmount};
use crate::config::BridgeConfig;
use crate::error::{ChainQueryError, InvalidAmountError};
use crate::query::ChainQuery;

/// Outcome of one balance read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BalanceReading {
    Known {
        amount: MinorAmount,
        /// Human-readable amount, e.g. `"12.50"`
        formatted: String,
    },
    Unknown {
        reason: String,
    },
}

impl BalanceReading {
    pub fn known(amount: MinorAmount, decimals: u8) -> Self {
        BalanceReading::Known {
            amount,
            formatted: to_decimal_string(amount, decimals),
        }
    }

    pub fn amount(&self) -> Option<MinorAmount> {
        match self {
            BalanceReading::Known { amount, .. } => Some(*amount),
            BalanceReading::Unknown { .. } => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, BalanceReading::Known { .. })
    }
}

/// Balances for whichever addresses were requested
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Balances {
    /// USDCx on Stacks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacks: Option<BalanceReading>,
    /// USDC on Ethereum
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ethereum: Option<BalanceReading>,
}

pub struct BalanceReader<Q: ChainQuery> {
    config: Arc<BridgeConfig>,
    query: Arc<Q>,
}

impl<Q: ChainQuery> BalanceReader<Q> {
    pub fn new(config: Arc<BridgeConfig>, query: Arc<Q>) -> Self {
        Self { config, query }
    }

    /// Raw bridged-asset balance of `address` on its own chain
    pub async fn balance_of(&self, address: &ChainAddress) -> Result<MinorAmount, ChainQueryError> {
        match address {
            ChainAddress::Stacks(principal) => {
                let asset = self.config.stacks.token_asset_identifier();
                self.query
                    .stacks_token_balance(&principal.to_string(), &asset)
                    .await
                    .map(MinorAmount::new)
            }
            ChainAddress::Ethereum(owner) => {
                let raw = self
                    .query
                    .erc20_balance(self.config.evm.usdc_address, *owner)
                    .await?;
                u256_to_amount(raw).map_err(|_| {
                    ChainQueryError::malformed(
                        address.chain(),
                        format!("balance {} exceeds 128 bits", raw),
                    )
                })
            }
        }
    }

    /// Like [`balance_of`](Self::balance_of), with failures folded into `Unknown`
    pub async fn read(&self, address: &ChainAddress) -> BalanceReading {
        match self.balance_of(address).await {
            Ok(amount) => BalanceReading::known(amount, self.config.amounts.decimals),
            Err(e) => {
                warn!(address = %address, error = %e, "Balance read failed");
                BalanceReading::Unknown {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Read both sides concurrently; one failing does not affect the other
    pub async fn get_balances(
        &self,
        stacks: Option<&ChainAddress>,
        ethereum: Option<&ChainAddress>,
    ) -> Balances {
        let stacks_read = async {
            match stacks {
                Some(address) => Some(self.read(address).await),
                None => None,
            }
        };
        let ethereum_read = async {
            match ethereum {
                Some(address) => Some(self.read(address).await),
                None => None,
            }
        };

        let (stacks, ethereum) = tokio::join!(stacks_read, ethereum_read);
        Balances { stacks, ethereum }
    }
}

fn u256_to_amount(raw: U256) -> Result<MinorAmount, InvalidAmountError> {
    u128::try_from(raw)
        .map(MinorAmount::new)
        .map_err(|_| InvalidAmountError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address_codec::ChainTag;
    use crate::testing::{fixtures, MockChainQuery};

    fn reader(query: MockChainQuery) -> BalanceReader<MockChainQuery> {
        BalanceReader::new(Arc::new(fixtures::testnet_config()), Arc::new(query))
    }

    fn stacks() -> ChainAddress {
        ChainAddress::parse(fixtures::STACKS_TESTNET_USER, ChainTag::Stacks).unwrap()
    }

    fn ethereum() -> ChainAddress {
        ChainAddress::parse(fixtures::EVM_USER, ChainTag::Ethereum).unwrap()
    }

    #[tokio::test]
    async fn test_balance_of_both_chains() {
        let reader = reader(
            MockChainQuery::new()
                .with_stacks_balance(12_500_000)
                .with_evm_balance(3_000_001),
        );
        assert_eq!(
            reader.balance_of(&stacks()).await.unwrap(),
            MinorAmount::new(12_500_000)
        );
        assert_eq!(
            reader.balance_of(&ethereum()).await.unwrap(),
            MinorAmount::new(3_000_001)
        );
    }

    #[tokio::test]
    async fn test_failed_read_is_unknown_not_zero() {
        let reader = reader(
            MockChainQuery::new()
                .with_stacks_balance(7_000_000)
                .with_evm_balance_error("connection refused"),
        );
        let balances = reader.get_balances(Some(&stacks()), Some(&ethereum())).await;

        assert_eq!(
            balances.stacks,
            Some(BalanceReading::Known {
                amount: MinorAmount::new(7_000_000),
                formatted: "7.00".to_string(),
            })
        );
        let ethereum = balances.ethereum.unwrap();
        assert!(!ethereum.is_known());
        assert_eq!(ethereum.amount(), None);
    }

    #[tokio::test]
    async fn test_zero_balance_is_known() {
        let reader = reader(MockChainQuery::new());
        let reading = reader.read(&stacks()).await;
        assert_eq!(reading.amount(), Some(MinorAmount::ZERO));
    }

    #[tokio::test]
    async fn test_omitted_address_is_not_queried() {
        let query = Arc::new(MockChainQuery::new());
        let reader = BalanceReader::new(Arc::new(fixtures::testnet_config()), query.clone());
        let balances = reader.get_balances(Some(&stacks()), None).await;

        assert!(balances.ethereum.is_none());
        assert_eq!(query.call_count("erc20_balance"), 0);
        assert_eq!(query.call_count("stacks_token_balance"), 1);
    }

    #[test]
    fn test_u256_overflow() {
        assert!(u256_to_amount(U256::MAX).is_err());
        assert_eq!(
            u256_to_amount(U256::from(42u64)).unwrap(),
            MinorAmount::new(42)
        );
    }
}
