//! Cross-Chain Address Encoding
//!
//! Converts between the native textual address formats of Stacks and
//! Ethereum and the fixed 32-byte fields each side's bridge contract expects.
//!
//! ## Layouts
//!
//! A Stacks address as consumed by the Ethereum bridge contract:
//! ```text
//! | Zero padding (11 bytes) | Version (1 byte) | hash160 (20 bytes) |
//! ```
//!
//! An Ethereum address as consumed by the Stacks bridge contract:
//! ```text
//! | Raw address (20 bytes) | Zero padding (12 bytes) |
//! ```
//!
//! Decoding is the exact inverse and rejects non-zero padding.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AddressFormatError;
use crate::types::Network;

// ============================================================================
// Stacks Version Bytes
// ============================================================================

/// Mainnet single-signature (`SP...`)
pub const STACKS_VERSION_MAINNET_SINGLE_SIG: u8 = 22;

/// Mainnet multi-signature (`SM...`)
pub const STACKS_VERSION_MAINNET_MULTI_SIG: u8 = 20;

/// Testnet single-signature (`ST...`)
pub const STACKS_VERSION_TESTNET_SINGLE_SIG: u8 = 26;

/// Testnet multi-signature (`SN...`)
pub const STACKS_VERSION_TESTNET_MULTI_SIG: u8 = 21;

/// Zero bytes preceding the version byte in the 32-byte Stacks layout
const STACKS_PADDING_LEN: usize = 11;

/// Longest contract name accepted by Clarity 2
const MAX_CONTRACT_NAME_LEN: usize = 128;

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

// ============================================================================
// Chain Tag
// ============================================================================

/// The closed set of chains this crate bridges between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainTag {
    /// Account-based chain (c32check addresses, post-conditions)
    Stacks,
    /// Contract-based chain (EVM, ERC-20 allowances)
    Ethereum,
}

impl fmt::Display for ChainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainTag::Stacks => f.write_str("stacks"),
            ChainTag::Ethereum => f.write_str("ethereum"),
        }
    }
}

impl FromStr for ChainTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stacks" | "stx" => Ok(ChainTag::Stacks),
            "ethereum" | "eth" | "evm" => Ok(ChainTag::Ethereum),
            other => Err(format!("Unknown chain: {}", other)),
        }
    }
}

// ============================================================================
// Stacks Address
// ============================================================================

/// Decoded Stacks standard principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StacksAddress {
    pub version: u8,
    pub hash160: [u8; 20],
}

impl StacksAddress {
    pub fn new(version: u8, hash160: [u8; 20]) -> Result<Self, AddressFormatError> {
        if network_for_version(version).is_none() {
            return Err(AddressFormatError::UnsupportedVersion(version));
        }
        Ok(Self { version, hash160 })
    }

    /// Parse a canonical c32check address (`SP...`, `ST...`, `SM...`, `SN...`)
    pub fn parse(text: &str) -> Result<Self, AddressFormatError> {
        if text.is_empty() {
            return Err(AddressFormatError::Empty);
        }

        let rest = text
            .strip_prefix('S')
            .ok_or_else(|| AddressFormatError::InvalidPrefix(text.chars().take(2).collect()))?;

        let mut chars = rest.chars();
        let version_char = chars
            .next()
            .ok_or(AddressFormatError::InvalidLength {
                expected: 20,
                got: 0,
            })?;
        let version = c32_value(version_char)?;
        if network_for_version(version).is_none() {
            return Err(AddressFormatError::UnsupportedVersion(version));
        }

        let decoded = c32_decode(chars.as_str())?;
        if decoded.len() != 24 {
            return Err(AddressFormatError::InvalidLength {
                expected: 20,
                got: decoded.len().saturating_sub(4),
            });
        }

        let (payload, checksum) = decoded.split_at(20);
        if c32_checksum(version, payload) != checksum {
            return Err(AddressFormatError::ChecksumMismatch);
        }

        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(payload);
        let address = Self { version, hash160 };

        let canonical = address.to_string();
        if canonical != text {
            return Err(AddressFormatError::NonCanonical { canonical });
        }

        Ok(address)
    }

    /// Network this address version belongs to
    pub fn network(&self) -> Network {
        // Constructors only admit the four known versions.
        network_for_version(self.version).unwrap_or(Network::Testnet)
    }

    /// Reject addresses from the other Stacks network
    pub fn ensure_network(&self, expected: Network) -> Result<(), AddressFormatError> {
        if self.network() != expected {
            return Err(AddressFormatError::NetworkMismatch {
                address: self.to_string(),
                expected: expected.to_string(),
                actual: self.network().to_string(),
            });
        }
        Ok(())
    }

    /// Layout: | zero (11) | version (1) | hash160 (20) |
    pub fn to_bytes32(&self) -> [u8; 32] {
        let mut result = [0u8; 32];
        result[STACKS_PADDING_LEN] = self.version;
        result[STACKS_PADDING_LEN + 1..].copy_from_slice(&self.hash160);
        result
    }

    pub fn from_bytes32(bytes: &[u8; 32]) -> Result<Self, AddressFormatError> {
        if bytes[..STACKS_PADDING_LEN].iter().any(|b| *b != 0) {
            return Err(AddressFormatError::NonZeroPadding);
        }
        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(&bytes[STACKS_PADDING_LEN + 1..]);
        Self::new(bytes[STACKS_PADDING_LEN], hash160)
    }

    /// Consensus encoding: | version (1) | hash160 (20) |
    pub fn to_consensus_bytes(&self) -> [u8; 21] {
        let mut result = [0u8; 21];
        result[0] = self.version;
        result[1..].copy_from_slice(&self.hash160);
        result
    }
}

impl fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut data = self.hash160.to_vec();
        data.extend_from_slice(&c32_checksum(self.version, &self.hash160));
        write!(
            f,
            "S{}{}",
            C32_ALPHABET[(self.version & 0x1f) as usize] as char,
            c32_encode(&data)
        )
    }
}

impl FromStr for StacksAddress {
    type Err = AddressFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for StacksAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StacksAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn network_for_version(version: u8) -> Option<Network> {
    match version {
        STACKS_VERSION_MAINNET_SINGLE_SIG | STACKS_VERSION_MAINNET_MULTI_SIG => {
            Some(Network::Mainnet)
        }
        STACKS_VERSION_TESTNET_SINGLE_SIG | STACKS_VERSION_TESTNET_MULTI_SIG => {
            Some(Network::Testnet)
        }
        _ => None,
    }
}

// ============================================================================
// Stacks Contract Principal
// ============================================================================

/// Stacks contract identifier (`ADDRESS.contract-name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractPrincipal {
    pub address: StacksAddress,
    pub name: String,
}

impl ContractPrincipal {
    pub fn parse(text: &str) -> Result<Self, AddressFormatError> {
        let (address, name) = text
            .split_once('.')
            .ok_or_else(|| AddressFormatError::InvalidContractId(text.to_string()))?;

        if !is_valid_contract_name(name) {
            return Err(AddressFormatError::InvalidContractId(text.to_string()));
        }

        Ok(Self {
            address: StacksAddress::parse(address)?,
            name: name.to_string(),
        })
    }

    /// Fully-qualified fungible token identifier (`ADDRESS.contract::asset`)
    pub fn asset_identifier(&self, asset_name: &str) -> String {
        format!("{}::{}", self, asset_name)
    }
}

impl fmt::Display for ContractPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.name)
    }
}

impl FromStr for ContractPrincipal {
    type Err = AddressFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ContractPrincipal {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Clarity names: a letter followed by letters, digits, `-` or `_`
pub fn is_valid_contract_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    name.len() <= MAX_CONTRACT_NAME_LEN
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// ============================================================================
// Ethereum Address
// ============================================================================

/// Parse a 0x-prefixed, EIP-55 checksummed Ethereum address
///
/// Mixed case with a wrong checksum is a `ChecksumMismatch`. Single-case hex
/// carries no checksum and is rejected as `NonCanonical` with the
/// checksummed spelling, so every accepted text decodes back unchanged.
pub fn parse_evm_address(text: &str) -> Result<Address, AddressFormatError> {
    if text.is_empty() {
        return Err(AddressFormatError::Empty);
    }

    let hex_str = text
        .strip_prefix("0x")
        .ok_or_else(|| AddressFormatError::InvalidPrefix(text.chars().take(2).collect()))?;

    if hex_str.len() != 40 {
        return Err(AddressFormatError::InvalidLength {
            expected: 40,
            got: hex_str.len(),
        });
    }

    if let Some(bad) = hex_str.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(AddressFormatError::InvalidCharacter(bad));
    }

    let bytes = hex::decode(hex_str).map_err(|_| AddressFormatError::InvalidLength {
        expected: 40,
        got: hex_str.len(),
    })?;
    let address = Address::from_slice(&bytes);

    let canonical = address.to_checksum(None);
    if canonical != text {
        let has_lower = hex_str.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = hex_str.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err(AddressFormatError::ChecksumMismatch);
        }
        return Err(AddressFormatError::NonCanonical { canonical });
    }

    Ok(address)
}

/// Layout: | raw address (20) | zero (12) |
pub fn evm_address_to_bytes32(address: &Address) -> [u8; 32] {
    let mut result = [0u8; 32];
    result[..20].copy_from_slice(address.as_slice());
    result
}

pub fn evm_address_from_bytes32(bytes: &[u8; 32]) -> Result<Address, AddressFormatError> {
    if bytes[20..].iter().any(|b| *b != 0) {
        return Err(AddressFormatError::NonZeroPadding);
    }
    Ok(Address::from_slice(&bytes[..20]))
}

// ============================================================================
// Chain Address
// ============================================================================

/// An address on one of the two bridged chains, in decoded canonical form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainAddress {
    Stacks(StacksAddress),
    Ethereum(Address),
}

impl ChainAddress {
    pub fn parse(text: &str, chain: ChainTag) -> Result<Self, AddressFormatError> {
        let text = text.trim();
        match chain {
            ChainTag::Stacks => StacksAddress::parse(text).map(ChainAddress::Stacks),
            ChainTag::Ethereum => parse_evm_address(text).map(ChainAddress::Ethereum),
        }
    }

    pub fn chain(&self) -> ChainTag {
        match self {
            ChainAddress::Stacks(_) => ChainTag::Stacks,
            ChainAddress::Ethereum(_) => ChainTag::Ethereum,
        }
    }

    /// The 32-byte form the opposite chain's bridge contract consumes
    pub fn to_bytes32(&self) -> [u8; 32] {
        match self {
            ChainAddress::Stacks(addr) => addr.to_bytes32(),
            ChainAddress::Ethereum(addr) => evm_address_to_bytes32(addr),
        }
    }

    pub fn from_bytes32(bytes: &[u8; 32], chain: ChainTag) -> Result<Self, AddressFormatError> {
        match chain {
            ChainTag::Stacks => StacksAddress::from_bytes32(bytes).map(ChainAddress::Stacks),
            ChainTag::Ethereum => evm_address_from_bytes32(bytes).map(ChainAddress::Ethereum),
        }
    }

    pub fn as_stacks(&self) -> Result<&StacksAddress, AddressFormatError> {
        match self {
            ChainAddress::Stacks(addr) => Ok(addr),
            other => Err(AddressFormatError::WrongChain {
                expected: ChainTag::Stacks,
                got: other.chain(),
            }),
        }
    }

    pub fn as_ethereum(&self) -> Result<&Address, AddressFormatError> {
        match self {
            ChainAddress::Ethereum(addr) => Ok(addr),
            other => Err(AddressFormatError::WrongChain {
                expected: ChainTag::Ethereum,
                got: other.chain(),
            }),
        }
    }
}

impl fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainAddress::Stacks(addr) => write!(f, "{}", addr),
            ChainAddress::Ethereum(addr) => f.write_str(&addr.to_checksum(None)),
        }
    }
}

impl Serialize for ChainAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// Codec Entry Points
// ============================================================================

/// Encode a textual address into the 32-byte bridge argument for `chain`
pub fn encode(address: &str, chain: ChainTag) -> Result<[u8; 32], AddressFormatError> {
    ChainAddress::parse(address, chain).map(|addr| addr.to_bytes32())
}

/// Decode a 32-byte bridge argument back to its canonical textual address
pub fn decode(bytes: &[u8; 32], chain: ChainTag) -> Result<String, AddressFormatError> {
    ChainAddress::from_bytes32(bytes, chain).map(|addr| addr.to_string())
}

/// Whether `address` is a well-formed address for `chain`
pub fn validate(address: &str, chain: ChainTag) -> bool {
    ChainAddress::parse(address, chain).is_ok()
}

// ============================================================================
// c32 Helpers
// ============================================================================

fn c32_checksum(version: u8, payload: &[u8]) -> [u8; 4] {
    let mut preimage = Vec::with_capacity(payload.len() + 1);
    preimage.push(version);
    preimage.extend_from_slice(payload);

    let digest = Sha256::digest(Sha256::digest(&preimage));
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&digest[..4]);
    checksum
}

fn c32_value(c: char) -> Result<u8, AddressFormatError> {
    let normalized = match c.to_ascii_uppercase() {
        'O' => '0',
        'L' | 'I' => '1',
        other => other,
    };
    C32_ALPHABET
        .iter()
        .position(|a| *a as char == normalized)
        .map(|pos| pos as u8)
        .ok_or(AddressFormatError::InvalidCharacter(c))
}

fn c32_encode(input: &[u8]) -> String {
    let mut result = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u8 = 0;
    let mut carry_bits: u8 = 0;

    for byte in input.iter().rev() {
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = byte & ((1u8 << low_bits_to_take) - 1);
        result.push(C32_ALPHABET[((low_bits << carry_bits) + carry) as usize]);

        carry_bits = 8 + carry_bits - 5;
        carry = byte >> (8 - carry_bits);

        if carry_bits >= 5 {
            result.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }

    if carry_bits > 0 {
        result.push(C32_ALPHABET[carry as usize]);
    }

    while result.last() == Some(&C32_ALPHABET[0]) {
        result.pop();
    }
    for _ in input.iter().take_while(|b| **b == 0) {
        result.push(C32_ALPHABET[0]);
    }

    result.reverse();
    result.into_iter().map(char::from).collect()
}

fn c32_decode(input: &str) -> Result<Vec<u8>, AddressFormatError> {
    let digits = input.chars().map(c32_value).collect::<Result<Vec<u8>, _>>()?;

    let mut result = Vec::with_capacity(input.len() * 5 / 8 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;

    for digit in digits.iter().rev() {
        carry += (*digit as u16) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            result.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }

    if carry_bits > 0 {
        result.push(carry as u8);
    }

    while result.last() == Some(&0) {
        result.pop();
    }
    for _ in digits.iter().take_while(|d| **d == 0) {
        result.push(0);
    }

    result.reverse();
    Ok(result)
}
