//! Test Fixtures
//!
//! Addresses here are real, checksum-valid encodings so they exercise the
//! same parsing paths as user input.

use std::time::Duration;

use alloy::primitives::{address, Address};

use crate::address_codec::ContractPrincipal;
use crate::amount::{AmountPolicy, MinorAmount};
use crate::config::{BridgeConfig, DomainConfig, EvmConfig, StacksConfig, StatusConfig};
use crate::types::Network;

/// Testnet single-sig principal (hash160 `a46ff888...5bd39d`)
pub const STACKS_TESTNET_USER: &str = "ST2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQYAC0RQ";

/// Second testnet principal (hash160 `12345678...12345678`)
pub const STACKS_TESTNET_OTHER: &str = "ST938NKRJ2NWVVRJ6HB7H45BSQQH4D2PF019FP6P";

/// Mainnet encoding of the same key as [`STACKS_TESTNET_USER`]
pub const STACKS_MAINNET_USER: &str = "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7";

/// Testnet multi-sig principal with hash160 `00..01`
pub const STACKS_TESTNET_MULTISIG: &str = "SN00000000000000000005341MC8";

/// EIP-55 checksummed user account
pub const EVM_USER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

pub const TOKEN_CONTRACT: &str = "ST2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQYAC0RQ.usdcx";
pub const BRIDGE_CONTRACT: &str = "ST2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQYAC0RQ.usdcx-v1";
pub const TOKEN_ASSET_NAME: &str = "usdcx-token";

pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

/// Sepolia USDC
pub const USDC_ADDRESS: Address = address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238");

pub const XRESERVE_ADDRESS: Address = address!("5fbdb2315678afecb367f032d93f642f64180aa3");

pub fn evm_user() -> Address {
    address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266")
}

fn contract(id: &str) -> ContractPrincipal {
    match ContractPrincipal::parse(id) {
        Ok(principal) => principal,
        Err(e) => panic!("fixture contract {} is invalid: {}", id, e),
    }
}

/// Valid testnet configuration pointing at unreachable endpoints
pub fn testnet_config() -> BridgeConfig {
    BridgeConfig {
        network: Network::Testnet,
        evm: EvmConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: SEPOLIA_CHAIN_ID,
            usdc_address: USDC_ADDRESS,
            xreserve_address: XRESERVE_ADDRESS,
            deposit_gas_limit: 150_000,
            deposit_max_fee: MinorAmount::ZERO,
        },
        stacks: StacksConfig {
            api_url: "http://127.0.0.1:3999".to_string(),
            api_key: None,
            bridge_contract: contract(BRIDGE_CONTRACT),
            token_contract: contract(TOKEN_CONTRACT),
            token_asset_name: TOKEN_ASSET_NAME.to_string(),
            withdrawal_fee_ustx: 10_000,
        },
        domains: DomainConfig::default(),
        amounts: AmountPolicy::default(),
        status: StatusConfig {
            poll_timeout: Duration::from_millis(500),
            ..StatusConfig::default()
        },
    }
}

/// `0x` + 64 lowercase hex digits built from a repeated byte
pub fn tx_id(fill: u8) -> String {
    format!("0x{}", hex::encode([fill; 32]))
}
