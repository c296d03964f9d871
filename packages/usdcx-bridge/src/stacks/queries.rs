//! Stacks API Query Helpers
//!
//! Read-only access to a Stacks node / Hiro API instance: transaction
//! lookup, chain tip height and fungible token balances.

use std::collections::HashMap;
use std::time::Duration;

use eyre::{eyre, Result, WrapErr};
use reqwest::header::HeaderValue;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::redact::Redacted;

/// Header carrying the optional API key
const API_KEY_HEADER: &str = "x-api-key";

/// Lifecycle status as reported by the Stacks API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StacksTxStatus {
    Pending,
    Success,
    AbortByResponse,
    AbortByPostCondition,
    /// Any `dropped_*` status, with the raw status string
    Dropped(String),
}

impl StacksTxStatus {
    pub fn parse(status: &str) -> Result<Self> {
        match status {
            "pending" => Ok(StacksTxStatus::Pending),
            "success" => Ok(StacksTxStatus::Success),
            "abort_by_response" => Ok(StacksTxStatus::AbortByResponse),
            "abort_by_post_condition" => Ok(StacksTxStatus::AbortByPostCondition),
            other if other.starts_with("dropped_") => Ok(StacksTxStatus::Dropped(other.to_string())),
            other => Err(eyre!("Unknown Stacks tx_status: {}", other)),
        }
    }
}

/// Transaction record from `/extended/v1/tx/{txid}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StacksTxRecord {
    pub status: StacksTxStatus,
    pub block_height: Option<u64>,
    /// Clarity representation of the call result, e.g. `(err u1)`
    pub result_repr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    tx_status: String,
    #[serde(default)]
    block_height: Option<u64>,
    #[serde(default)]
    tx_result: Option<TxResult>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    #[serde(default)]
    repr: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    stacks_tip_height: u64,
}

#[derive(Debug, Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    fungible_tokens: HashMap<String, TokenBalance>,
}

#[derive(Debug, Deserialize)]
struct TokenBalance {
    balance: String,
}

/// Stacks API query client
pub struct StacksQueryClient {
    /// API base URL
    api_url: String,
    /// Optional API key, already marked sensitive
    api_key: Option<HeaderValue>,
    /// HTTP client
    client: Client,
}

impl StacksQueryClient {
    /// Create a new query client
    pub fn new(api_url: &str, api_key: Option<&Redacted<String>>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .wrap_err("Failed to build HTTP client")?;

        let api_key = api_key
            .map(|key| key.header_value().wrap_err("Invalid STACKS_API_KEY"))
            .transpose()?;

        info!(
            api_url = %api_url,
            authenticated = api_key.is_some(),
            "Created Stacks API query client"
        );

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let request = self.client.get(format!("{}{}", self.api_url, path));
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key.clone()),
            None => request,
        }
    }

    // =========================================================================
    // Transaction Queries
    // =========================================================================

    /// Get a transaction by id; `None` while the API has never seen it
    pub async fn get_transaction(&self, tx_id: &str) -> Result<Option<StacksTxRecord>> {
        let response = self
            .get(&format!("/extended/v1/tx/{}", tx_id))
            .send()
            .await
            .wrap_err("Failed to query transaction")?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(tx_id = %tx_id, "Stacks transaction not found yet");
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(eyre!(
                "Tx query failed: {} - {}",
                response.status(),
                response.text().await.unwrap_or_default()
            ));
        }

        let tx: TxResponse = response
            .json()
            .await
            .wrap_err("Failed to parse transaction response")?;

        Ok(Some(StacksTxRecord {
            status: StacksTxStatus::parse(&tx.tx_status)?,
            block_height: tx.block_height,
            result_repr: tx.tx_result.and_then(|r| r.repr),
        }))
    }

    /// Get the current chain tip height
    pub async fn get_tip_height(&self) -> Result<u64> {
        let response = self
            .get("/v2/info")
            .send()
            .await
            .wrap_err("Failed to query node info")?;

        if !response.status().is_success() {
            return Err(eyre!("Info query failed: {}", response.status()));
        }

        let info: InfoResponse = response
            .json()
            .await
            .wrap_err("Failed to parse node info")?;
        Ok(info.stacks_tip_height)
    }

    // =========================================================================
    // Balance Queries
    // =========================================================================

    /// Get a fungible token balance (`asset_identifier` = `ADDR.contract::asset`)
    ///
    /// An asset absent from the response is a zero balance: the API lists
    /// every token the principal has ever held.
    pub async fn get_fungible_balance(&self, principal: &str, asset_identifier: &str) -> Result<u128> {
        let response = self
            .get(&format!("/extended/v1/address/{}/balances", principal))
            .send()
            .await
            .wrap_err("Failed to query balances")?;

        if !response.status().is_success() {
            return Err(eyre!("Balance query failed: {}", response.status()));
        }

        let balances: BalancesResponse = response
            .json()
            .await
            .wrap_err("Failed to parse balances")?;

        match balances.fungible_tokens.get(asset_identifier) {
            Some(token) => token
                .balance
                .parse()
                .map_err(|e| eyre!("Invalid balance '{}': {}", token.balance, e)),
            None => Ok(0),
        }
    }
}
