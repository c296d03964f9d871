//! Bridge facade
//!
//! The operations exposed to a transport layer. Each one takes raw user
//! input, validates it, and delegates to the component that owns the logic.
//! All components share one read-only [`ChainQuery`].

use std::sync::Arc;

use tracing::instrument;

use crate::address_codec::{ChainAddress, ChainTag};
use crate::balance::{BalanceReader, Balances};
use crate::config::BridgeConfig;
use crate::deposit::DepositPreparer;
use crate::error::{BridgeError, StatusError};
use crate::query::{ChainQuery, RpcChainQuery};
use crate::status::StatusTracker;
use crate::types::{TransactionDescriptor, TransactionStatus};
use crate::withdrawal::WithdrawalPreparer;

pub struct UsdcxBridge<Q: ChainQuery> {
    config: Arc<BridgeConfig>,
    deposits: DepositPreparer<Q>,
    withdrawals: WithdrawalPreparer<Q>,
    status: StatusTracker<Q>,
    balances: BalanceReader<Q>,
}

impl UsdcxBridge<RpcChainQuery> {
    /// Bridge backed by the configured Ethereum RPC and Stacks API
    pub fn from_config(config: BridgeConfig) -> eyre::Result<Self> {
        let query = RpcChainQuery::from_config(&config)?;
        Ok(Self::new(config, query))
    }
}

impl<Q: ChainQuery> UsdcxBridge<Q> {
    pub fn new(config: BridgeConfig, query: Q) -> Self {
        Self::with_shared(Arc::new(config), Arc::new(query))
    }

    pub fn with_shared(config: Arc<BridgeConfig>, query: Arc<Q>) -> Self {
        Self {
            deposits: DepositPreparer::new(config.clone(), query.clone()),
            withdrawals: WithdrawalPreparer::new(config.clone(), query.clone()),
            status: StatusTracker::new(config.clone(), query.clone()),
            balances: BalanceReader::new(config.clone(), query),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Prepare an Ethereum → Stacks deposit
    ///
    /// `destination` is the Stacks recipient, `source` the Ethereum sender.
    #[instrument(skip(self))]
    pub async fn prepare_deposit(
        &self,
        amount: &str,
        destination: &str,
        source: &str,
    ) -> Result<TransactionDescriptor, BridgeError> {
        let amount = self.config.amounts.parse(amount)?;
        let destination = ChainAddress::parse(destination, ChainTag::Stacks)?;
        let source = ChainAddress::parse(source, ChainTag::Ethereum)?;
        self.deposits.prepare(amount, &destination, &source).await
    }

    /// Prepare a Stacks → Ethereum withdrawal
    ///
    /// `destination` is the Ethereum recipient, `source` the Stacks sender.
    #[instrument(skip(self))]
    pub async fn prepare_withdrawal(
        &self,
        amount: &str,
        destination: &str,
        source: &str,
    ) -> Result<TransactionDescriptor, BridgeError> {
        let amount = self.config.amounts.parse(amount)?;
        let destination = ChainAddress::parse(destination, ChainTag::Ethereum)?;
        let source = ChainAddress::parse(source, ChainTag::Stacks)?;
        self.withdrawals.prepare(amount, &destination, &source).await
    }

    /// Poll one transaction; pass the last snapshot to detect regressions
    #[instrument(skip(self, previous))]
    pub async fn check_status(
        &self,
        tx_id: &str,
        chain: ChainTag,
        previous: Option<&TransactionStatus>,
    ) -> Result<TransactionStatus, BridgeError> {
        self.status.check_status(tx_id, chain, previous).await
    }

    pub fn confirm_completion(
        &self,
        previous: &TransactionStatus,
    ) -> Result<TransactionStatus, StatusError> {
        self.status.confirm_completion(previous)
    }

    /// Read USDCx and/or USDC balances
    ///
    /// Malformed addresses are rejected up front; read failures after that
    /// are reported per side as `Unknown`.
    pub async fn get_balances(
        &self,
        stacks: Option<&str>,
        ethereum: Option<&str>,
    ) -> Result<Balances, BridgeError> {
        let stacks = stacks
            .map(|a| ChainAddress::parse(a, ChainTag::Stacks))
            .transpose()?;
        let ethereum = ethereum
            .map(|a| ChainAddress::parse(a, ChainTag::Ethereum))
            .transpose()?;

        Ok(self
            .balances
            .get_balances(stacks.as_ref(), ethereum.as_ref())
            .await)
    }
}
