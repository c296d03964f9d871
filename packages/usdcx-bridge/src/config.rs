//! Bridge configuration
//!
//! Contract addresses, network selection, minimums and status thresholds
//! live in one [`BridgeConfig`] value handed to every component at
//! construction.

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};

use crate::address_codec::{is_valid_contract_name, parse_evm_address, ContractPrincipal};
use crate::amount::{AmountPolicy, MinorAmount, USDC_DECIMALS};
use crate::error::InvalidAmountError;
use crate::redact::Redacted;
use crate::types::{BridgeDirection, Network};

/// Main configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub network: Network,
    pub evm: EvmConfig,
    pub stacks: StacksConfig,
    pub domains: DomainConfig,
    pub amounts: AmountPolicy,
    pub status: StatusConfig,
}

/// Ethereum configuration
#[derive(Debug, Clone)]
pub struct EvmConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// USDC token contract
    pub usdc_address: Address,
    /// xReserve bridge contract (allowance spender)
    pub xreserve_address: Address,
    /// Gas limit for the deposit call when it cannot be estimated before approval
    pub deposit_gas_limit: u64,
    /// Fee cap passed to `depositToRemote`
    pub deposit_max_fee: MinorAmount,
}

/// Stacks configuration
#[derive(Debug, Clone)]
pub struct StacksConfig {
    pub api_url: String,
    pub api_key: Option<Redacted<String>>,
    /// Contract exposing `burn` for withdrawals
    pub bridge_contract: ContractPrincipal,
    /// Contract defining the USDCx fungible token
    pub token_contract: ContractPrincipal,
    pub token_asset_name: String,
    /// Fee estimate attached to withdrawal descriptors, in micro-STX
    pub withdrawal_fee_ustx: u64,
}

impl StacksConfig {
    /// `ADDR.contract::asset` identifier of USDCx
    pub fn token_asset_identifier(&self) -> String {
        self.token_contract.asset_identifier(&self.token_asset_name)
    }
}

/// Domain identifiers understood by the bridge contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainConfig {
    pub ethereum: u32,
    pub stacks: u32,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            ethereum: 0,
            stacks: 10003,
        }
    }
}

/// Confirmation and attestation timing for one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Source-chain confirmations before attestation begins
    pub required_confirmations: u64,
    /// Average source-chain block time
    pub block_time: Duration,
    /// Expected attestation duration once confirmations are reached
    pub attestation_eta: Duration,
    /// Attesting longer than this is reported as presumed complete
    pub max_attestation_wait: Duration,
}

impl ConfirmationPolicy {
    /// Ethereum-originated transfers
    pub fn deposit_default() -> Self {
        Self {
            required_confirmations: 12,
            block_time: Duration::from_secs(12),
            attestation_eta: Duration::from_secs(15 * 60),
            max_attestation_wait: Duration::from_secs(30 * 60),
        }
    }

    /// Stacks-originated transfers
    pub fn withdrawal_default() -> Self {
        Self {
            required_confirmations: 3,
            block_time: Duration::from_secs(5),
            attestation_eta: Duration::from_secs(25 * 60),
            max_attestation_wait: Duration::from_secs(60 * 60),
        }
    }
}

/// Status tracker configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusConfig {
    pub deposit: ConfirmationPolicy,
    pub withdrawal: ConfirmationPolicy,
    /// Upper bound on a single poll round trip
    pub poll_timeout: Duration,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            deposit: ConfirmationPolicy::deposit_default(),
            withdrawal: ConfirmationPolicy::withdrawal_default(),
            poll_timeout: Duration::from_millis(default_poll_timeout_ms()),
        }
    }
}

impl StatusConfig {
    pub fn policy_for(&self, direction: BridgeDirection) -> &ConfirmationPolicy {
        match direction {
            BridgeDirection::Deposit => &self.deposit,
            BridgeDirection::Withdrawal => &self.withdrawal,
        }
    }
}

/// Default functions
fn default_deposit_gas_limit() -> u64 {
    150_000
}

fn default_withdrawal_fee_ustx() -> u64 {
    10_000
}

fn default_poll_timeout_ms() -> u64 {
    15_000
}

fn default_token_asset_name() -> String {
    "usdcx-token".to_string()
}

impl BridgeConfig {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let network: Network = optional_parse("BRIDGE_NETWORK", Network::Testnet)?;

        let evm = EvmConfig {
            rpc_url: required("EVM_RPC_URL")?,
            chain_id: required("EVM_CHAIN_ID")?
                .parse()
                .wrap_err("EVM_CHAIN_ID must be a valid u64")?,
            usdc_address: required_evm_address("EVM_USDC_ADDRESS")?,
            xreserve_address: required_evm_address("EVM_XRESERVE_ADDRESS")?,
            deposit_gas_limit: optional_parse("EVM_DEPOSIT_GAS_LIMIT", default_deposit_gas_limit())?,
            deposit_max_fee: optional_amount("DEPOSIT_MAX_FEE", MinorAmount::ZERO)?,
        };

        let stacks = StacksConfig {
            api_url: required("STACKS_API_URL")?,
            api_key: env::var("STACKS_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .map(Redacted),
            bridge_contract: required_contract("STACKS_BRIDGE_CONTRACT")?,
            token_contract: required_contract("STACKS_TOKEN_CONTRACT")?,
            token_asset_name: env::var("STACKS_TOKEN_ASSET_NAME")
                .unwrap_or_else(|_| default_token_asset_name()),
            withdrawal_fee_ustx: optional_parse(
                "STACKS_WITHDRAW_FEE_USTX",
                default_withdrawal_fee_ustx(),
            )?,
        };

        let domains = DomainConfig {
            ethereum: optional_parse("ETHEREUM_DOMAIN", DomainConfig::default().ethereum)?,
            stacks: optional_parse("STACKS_DOMAIN", DomainConfig::default().stacks)?,
        };

        let defaults = AmountPolicy::default();
        let amounts = AmountPolicy {
            decimals: USDC_DECIMALS,
            deposit_minimum: optional_amount("DEPOSIT_MINIMUM", defaults.deposit_minimum)?,
            withdrawal_minimum: optional_amount("WITHDRAWAL_MINIMUM", defaults.withdrawal_minimum)?,
        };

        let mut status = StatusConfig::default();
        status.deposit.required_confirmations =
            optional_parse("EVM_CONFIRMATIONS", status.deposit.required_confirmations)?;
        status.withdrawal.required_confirmations =
            optional_parse("STACKS_CONFIRMATIONS", status.withdrawal.required_confirmations)?;
        status.poll_timeout =
            Duration::from_millis(optional_parse("POLL_TIMEOUT_MS", default_poll_timeout_ms())?);

        let config = Self {
            network,
            evm,
            stacks,
            domains,
            amounts,
            status,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<()> {
        validate_url("EVM_RPC_URL", &self.evm.rpc_url)?;
        validate_url("STACKS_API_URL", &self.stacks.api_url)?;

        for contract in [&self.stacks.bridge_contract, &self.stacks.token_contract] {
            if contract.address.network() != self.network {
                return Err(eyre!(
                    "Stacks contract {} is not a {} contract",
                    contract,
                    self.network
                ));
            }
        }

        if !is_valid_contract_name(&self.stacks.token_asset_name) {
            return Err(eyre!(
                "Invalid STACKS_TOKEN_ASSET_NAME: {}",
                self.stacks.token_asset_name
            ));
        }

        if self.amounts.deposit_minimum.is_zero() || self.amounts.withdrawal_minimum.is_zero() {
            return Err(eyre!("Bridge minimums must be greater than zero"));
        }

        if self.amounts.deposit_minimum > self.amounts.withdrawal_minimum {
            return Err(eyre!(
                "Deposit minimum {} exceeds withdrawal minimum {}",
                self.amounts.deposit_minimum,
                self.amounts.withdrawal_minimum
            ));
        }

        if self.status.withdrawal.required_confirmations
            >= self.status.deposit.required_confirmations
        {
            return Err(eyre!(
                "Stacks confirmations ({}) must be fewer than Ethereum confirmations ({})",
                self.status.withdrawal.required_confirmations,
                self.status.deposit.required_confirmations
            ));
        }

        if self.evm.deposit_gas_limit == 0 {
            return Err(eyre!("EVM_DEPOSIT_GAS_LIMIT must be greater than zero"));
        }

        Ok(())
    }
}

fn validate_url(name: &str, url_str: &str) -> Result<()> {
    url::Url::parse(url_str).map_err(|e| eyre!("{} must be a valid URL: {}", name, e))?;
    Ok(())
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| eyre!("{} environment variable is required", name))
}

fn required_evm_address(name: &str) -> Result<Address> {
    let raw = required(name)?;
    parse_evm_address(&raw).wrap_err_with(|| format!("{} is not a valid EVM address", name))
}

fn required_contract(name: &str) -> Result<ContractPrincipal> {
    let raw = required(name)?;
    ContractPrincipal::parse(&raw)
        .wrap_err_with(|| format!("{} is not a valid Stacks contract identifier", name))
}

fn optional_parse<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| eyre!("Invalid {}: {}", name, e)),
        _ => Ok(default),
    }
}

fn optional_amount(name: &str, default: MinorAmount) -> Result<MinorAmount> {
    match env::var(name) {
        // "0" is a legitimate fee cap but not a positive amount
        Ok(raw) if !raw.trim().is_empty() => match MinorAmount::from_decimal(&raw) {
            Err(InvalidAmountError::NotPositive) => Ok(MinorAmount::ZERO),
            parsed => parsed.wrap_err_with(|| format!("Invalid {}", name)),
        },
        _ => Ok(default),
    }
}
