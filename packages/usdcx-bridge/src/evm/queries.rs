//! EVM Query Helpers
//!
//! Read-only access to an Ethereum JSON-RPC endpoint: ERC20 reads, gas
//! estimation, receipts and block height.

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Bytes, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::TransactionRequest,
    transports::http::{Client, Http},
};
use eyre::{eyre, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::evm::contracts::ERC20;

/// Receipt fields the status tracker needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvmReceipt {
    pub block_number: Option<u64>,
    /// `false` when the transaction reverted
    pub success: bool,
}

/// EVM query client
///
/// Uses a read-only provider (no signer needed).
pub struct EvmQueryClient {
    /// Read-only provider
    provider: RootProvider<Http<Client>>,
}

impl EvmQueryClient {
    /// Create a new query client
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );

        info!(rpc_url = %rpc_url, chain_id = chain_id, "Created read-only EVM query client");

        Ok(Self { provider })
    }

    // =========================================================================
    // ERC20 Queries
    // =========================================================================

    /// Get the allowance `owner` has granted `spender`
    pub async fn get_allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let contract = ERC20::new(token, &self.provider);
        let allowance = contract
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get allowance: {}", e))?;
        Ok(allowance._0)
    }

    /// Get the token balance of `account`
    pub async fn get_token_balance(&self, token: Address, account: Address) -> Result<U256> {
        let contract = ERC20::new(token, &self.provider);
        let balance = contract
            .balanceOf(account)
            .call()
            .await
            .map_err(|e| eyre!("Failed to get balance: {}", e))?;
        Ok(balance._0)
    }

    // =========================================================================
    // Transaction Queries
    // =========================================================================

    /// Estimate gas for a call made by `from`
    pub async fn estimate_gas(&self, from: Address, to: Address, input: Bytes) -> Result<u64> {
        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(input);

        let gas = self
            .provider
            .estimate_gas(&tx)
            .await
            .map_err(|e| eyre!("Failed to estimate gas: {}", e))?;

        debug!(from = %from, to = %to, gas = gas, "Estimated gas");
        Ok(gas)
    }

    /// Get a transaction receipt; `None` until the transaction is mined
    pub async fn get_receipt(&self, tx_hash: B256) -> Result<Option<EvmReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| eyre!("Failed to get receipt: {}", e))?;

        Ok(receipt.map(|r| EvmReceipt {
            block_number: r.block_number,
            success: r.status(),
        }))
    }

    /// Get the current block number
    pub async fn get_block_number(&self) -> Result<u64> {
        let block = self.provider.get_block_number().await?;
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_client_creation() {
        assert!(EvmQueryClient::new("http://localhost:8545", 11155111).is_ok());
    }

    #[test]
    fn test_invalid_rpc_url() {
        assert!(EvmQueryClient::new("not a url", 1).is_err());
    }
}
