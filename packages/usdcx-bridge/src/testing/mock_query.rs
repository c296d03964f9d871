//! Scriptable Chain Query
//!
//! In-memory [`ChainQuery`] whose answers are set up front by the test and
//! whose per-method call counts can be asserted afterwards.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::address_codec::ChainTag;
use crate::error::{ChainQueryError, EstimationError};
use crate::evm::EvmReceipt;
use crate::query::{ChainQuery, EvmCall};
use crate::stacks::{StacksTxRecord, StacksTxStatus};

#[derive(Debug)]
struct MockState {
    allowance: Result<U256, ChainQueryError>,
    evm_balance: Result<U256, ChainQueryError>,
    gas: Result<u64, EstimationError>,
    receipts: HashMap<B256, EvmReceipt>,
    evm_block: Result<u64, ChainQueryError>,
    stacks_txs: HashMap<String, StacksTxRecord>,
    stacks_height: Result<u64, ChainQueryError>,
    stacks_balance: Result<u128, ChainQueryError>,
    delay: Option<Duration>,
    calls: HashMap<&'static str, usize>,
    estimated: Vec<EvmCall>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            allowance: Ok(U256::ZERO),
            evm_balance: Ok(U256::ZERO),
            gas: Ok(21_000),
            receipts: HashMap::new(),
            evm_block: Ok(0),
            stacks_txs: HashMap::new(),
            stacks_height: Ok(0),
            stacks_balance: Ok(0),
            delay: None,
            calls: HashMap::new(),
            estimated: Vec::new(),
        }
    }
}

/// In-memory chain query for tests
#[derive(Debug, Default)]
pub struct MockChainQuery {
    state: Mutex<MockState>,
}

impl MockChainQuery {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_allowance(self, units: u128) -> Self {
        self.state().allowance = Ok(U256::from(units));
        self
    }

    pub fn with_evm_balance(self, units: u128) -> Self {
        self.state().evm_balance = Ok(U256::from(units));
        self
    }

    pub fn with_evm_balance_error(self, message: &str) -> Self {
        self.state().evm_balance = Err(ChainQueryError::rpc(ChainTag::Ethereum, message));
        self
    }

    pub fn with_gas(self, gas: u64) -> Self {
        self.state().gas = Ok(gas);
        self
    }

    pub fn with_gas_error(self, reason: &str) -> Self {
        self.state().gas = Err(EstimationError {
            reason: reason.to_string(),
        });
        self
    }

    pub fn with_stacks_balance(self, units: u128) -> Self {
        self.state().stacks_balance = Ok(units);
        self
    }

    pub fn with_stacks_balance_error(self, message: &str) -> Self {
        self.state().stacks_balance = Err(ChainQueryError::rpc(ChainTag::Stacks, message));
        self
    }

    /// Every query sleeps this long before answering
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state().delay = Some(delay);
        self
    }

    pub fn set_evm_block(&self, height: u64) {
        self.state().evm_block = Ok(height);
    }

    pub fn set_evm_receipt(&self, tx_hash: B256, block_number: Option<u64>, success: bool) {
        self.state().receipts.insert(
            tx_hash,
            EvmReceipt {
                block_number,
                success,
            },
        );
    }

    pub fn clear_evm_receipt(&self, tx_hash: B256) {
        self.state().receipts.remove(&tx_hash);
    }

    pub fn set_stacks_height(&self, height: u64) {
        self.state().stacks_height = Ok(height);
    }

    pub fn set_stacks_tx(&self, tx_id: &str, status: StacksTxStatus, block_height: Option<u64>) {
        let result_repr = match status {
            StacksTxStatus::AbortByResponse => Some("(err u1)".to_string()),
            StacksTxStatus::AbortByPostCondition => Some("(ok true)".to_string()),
            _ => None,
        };
        self.state().stacks_txs.insert(
            tx_id.to_string(),
            StacksTxRecord {
                status,
                block_height,
                result_repr,
            },
        );
    }

    /// Number of times `method` (a [`ChainQuery`] method name) was called
    pub fn call_count(&self, method: &str) -> usize {
        self.state().calls.get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    /// Calls passed to `estimate_gas`, in order
    pub fn estimated_calls(&self) -> Vec<EvmCall> {
        self.state().estimated.clone()
    }

    /// Count the call and return the configured delay
    fn record(&self, method: &'static str) -> Option<Duration> {
        let mut state = self.state();
        *state.calls.entry(method).or_insert(0) += 1;
        state.delay
    }

    async fn enter(&self, method: &'static str) {
        if let Some(delay) = self.record(method) {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ChainQuery for MockChainQuery {
    async fn erc20_allowance(
        &self,
        _token: Address,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, ChainQueryError> {
        self.enter("erc20_allowance").await;
        self.state().allowance.clone()
    }

    async fn erc20_balance(
        &self,
        _token: Address,
        _owner: Address,
    ) -> Result<U256, ChainQueryError> {
        self.enter("erc20_balance").await;
        self.state().evm_balance.clone()
    }

    async fn estimate_gas(&self, call: &EvmCall) -> Result<u64, EstimationError> {
        self.enter("estimate_gas").await;
        let mut state = self.state();
        state.estimated.push(call.clone());
        state.gas.clone()
    }

    async fn evm_receipt(&self, tx_hash: B256) -> Result<Option<EvmReceipt>, ChainQueryError> {
        self.enter("evm_receipt").await;
        Ok(self.state().receipts.get(&tx_hash).cloned())
    }

    async fn evm_block_number(&self) -> Result<u64, ChainQueryError> {
        self.enter("evm_block_number").await;
        self.state().evm_block.clone()
    }

    async fn stacks_transaction(
        &self,
        tx_id: &str,
    ) -> Result<Option<StacksTxRecord>, ChainQueryError> {
        self.enter("stacks_transaction").await;
        Ok(self.state().stacks_txs.get(tx_id).cloned())
    }

    async fn stacks_block_height(&self) -> Result<u64, ChainQueryError> {
        self.enter("stacks_block_height").await;
        self.state().stacks_height.clone()
    }

    async fn stacks_token_balance(
        &self,
        _principal: &str,
        _asset_identifier: &str,
    ) -> Result<u128, ChainQueryError> {
        self.enter("stacks_token_balance").await;
        self.state().stacks_balance.clone()
    }
}
