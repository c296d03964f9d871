//! Read-only chain query port
//!
//! Everything this crate needs from either chain goes through [`ChainQuery`].
//! Implementations must be safe to share between concurrent requests and
//! must report a not-yet-included transaction as `Ok(None)`, not an error.

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;

use crate::address_codec::ChainTag;
use crate::config::BridgeConfig;
use crate::error::{ChainQueryError, EstimationError};
use crate::evm::{EvmQueryClient, EvmReceipt};
use crate::stacks::{StacksQueryClient, StacksTxRecord};

/// Call whose gas should be estimated with the real sender as context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmCall {
    pub from: Address,
    pub to: Address,
    pub input: Bytes,
}

#[async_trait]
pub trait ChainQuery: Send + Sync {
    // ---- Ethereum ----

    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainQueryError>;

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256, ChainQueryError>;

    async fn estimate_gas(&self, call: &EvmCall) -> Result<u64, EstimationError>;

    async fn evm_receipt(&self, tx_hash: B256) -> Result<Option<EvmReceipt>, ChainQueryError>;

    async fn evm_block_number(&self) -> Result<u64, ChainQueryError>;

    // ---- Stacks ----

    async fn stacks_transaction(
        &self,
        tx_id: &str,
    ) -> Result<Option<StacksTxRecord>, ChainQueryError>;

    async fn stacks_block_height(&self) -> Result<u64, ChainQueryError>;

    async fn stacks_token_balance(
        &self,
        principal: &str,
        asset_identifier: &str,
    ) -> Result<u128, ChainQueryError>;
}

/// [`ChainQuery`] backed by an Ethereum JSON-RPC endpoint and a Stacks API
pub struct RpcChainQuery {
    evm: EvmQueryClient,
    stacks: StacksQueryClient,
}

impl RpcChainQuery {
    pub fn new(evm: EvmQueryClient, stacks: StacksQueryClient) -> Self {
        Self { evm, stacks }
    }

    pub fn from_config(config: &BridgeConfig) -> eyre::Result<Self> {
        let evm = EvmQueryClient::new(&config.evm.rpc_url, config.evm.chain_id)?;
        let stacks = StacksQueryClient::new(&config.stacks.api_url, config.stacks.api_key.as_ref())?;
        Ok(Self::new(evm, stacks))
    }
}

fn evm_error(err: eyre::Report) -> ChainQueryError {
    ChainQueryError::rpc(ChainTag::Ethereum, format!("{:#}", err))
}

fn stacks_error(err: eyre::Report) -> ChainQueryError {
    ChainQueryError::rpc(ChainTag::Stacks, format!("{:#}", err))
}

#[async_trait]
impl ChainQuery for RpcChainQuery {
    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainQueryError> {
        self.evm
            .get_allowance(token, owner, spender)
            .await
            .map_err(evm_error)
    }

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256, ChainQueryError> {
        self.evm
            .get_token_balance(token, owner)
            .await
            .map_err(evm_error)
    }

    async fn estimate_gas(&self, call: &EvmCall) -> Result<u64, EstimationError> {
        self.evm
            .estimate_gas(call.from, call.to, call.input.clone())
            .await
            .map_err(|e| EstimationError {
                reason: format!("{:#}", e),
            })
    }

    async fn evm_receipt(&self, tx_hash: B256) -> Result<Option<EvmReceipt>, ChainQueryError> {
        self.evm.get_receipt(tx_hash).await.map_err(evm_error)
    }

    async fn evm_block_number(&self) -> Result<u64, ChainQueryError> {
        self.evm.get_block_number().await.map_err(evm_error)
    }

    async fn stacks_transaction(
        &self,
        tx_id: &str,
    ) -> Result<Option<StacksTxRecord>, ChainQueryError> {
        self.stacks.get_transaction(tx_id).await.map_err(stacks_error)
    }

    async fn stacks_block_height(&self) -> Result<u64, ChainQueryError> {
        self.stacks.get_tip_height().await.map_err(stacks_error)
    }

    async fn stacks_token_balance(
        &self,
        principal: &str,
        asset_identifier: &str,
    ) -> Result<u128, ChainQueryError> {
        self.stacks
            .get_fungible_balance(principal, asset_identifier)
            .await
            .map_err(stacks_error)
    }
}
