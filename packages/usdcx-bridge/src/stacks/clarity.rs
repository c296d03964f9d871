//! Clarity value and contract-call payload encoding
//!
//! Only the value types the bridge contract takes as arguments are modelled.
//! Byte layouts follow the Stacks consensus serialization.

use crate::address_codec::ContractPrincipal;

const TYPE_PREFIX_UINT: u8 = 0x01;
const TYPE_PREFIX_BUFFER: u8 = 0x02;

/// Transaction payload type for a contract call
const PAYLOAD_TYPE_CONTRACT_CALL: u8 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    Uint(u128),
    Buffer(Vec<u8>),
}

impl ClarityValue {
    /// Layouts:
    /// - `uint`: | 0x01 | value (16 bytes, big-endian) |
    /// - `buff`: | 0x02 | length (4 bytes, big-endian) | bytes |
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            ClarityValue::Uint(value) => {
                let mut out = Vec::with_capacity(17);
                out.push(TYPE_PREFIX_UINT);
                out.extend_from_slice(&value.to_be_bytes());
                out
            }
            ClarityValue::Buffer(bytes) => {
                let mut out = Vec::with_capacity(5 + bytes.len());
                out.push(TYPE_PREFIX_BUFFER);
                out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                out.extend_from_slice(bytes);
                out
            }
        }
    }

    /// 0x-prefixed hex, the form wallets accept for `functionArgs`
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.serialize()))
    }
}

/// A contract call ready for the wallet to wrap in a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub contract: ContractPrincipal,
    pub function_name: String,
    pub args: Vec<ClarityValue>,
}

impl ContractCall {
    pub fn new(contract: ContractPrincipal, function_name: &str, args: Vec<ClarityValue>) -> Self {
        Self {
            contract,
            function_name: function_name.to_string(),
            args,
        }
    }

    /// Consensus encoding of the contract-call transaction payload
    ///
    /// Layout: | 0x02 | version (1) | hash160 (20) | name len (1) | name |
    /// function len (1) | function | arg count (4) | args... |
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut out = vec![PAYLOAD_TYPE_CONTRACT_CALL];
        out.extend_from_slice(&self.contract.address.to_consensus_bytes());
        push_short_string(&mut out, &self.contract.name);
        push_short_string(&mut out, &self.function_name);
        out.extend_from_slice(&(self.args.len() as u32).to_be_bytes());
        for arg in &self.args {
            out.extend_from_slice(&arg.serialize());
        }
        out
    }

    pub fn args_hex(&self) -> Vec<String> {
        self.args.iter().map(ClarityValue::to_hex).collect()
    }
}

/// Length-prefixed Clarity name; names are validated to fit one byte upstream
pub(crate) fn push_short_string(out: &mut Vec<u8>, value: &str) {
    out.push(value.len() as u8);
    out.extend_from_slice(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_serialization() {
        let encoded = ClarityValue::Uint(5_000_000).serialize();
        assert_eq!(encoded.len(), 17);
        assert_eq!(encoded[0], 0x01);
        assert_eq!(&encoded[1..13], &[0u8; 12]);
        assert_eq!(&encoded[13..], &5_000_000u32.to_be_bytes());
        assert_eq!(
            ClarityValue::Uint(1).to_hex(),
            "0x0100000000000000000000000000000001"
        );
    }

    #[test]
    fn test_buffer_serialization() {
        let encoded = ClarityValue::Buffer(vec![0xde, 0xad]).serialize();
        assert_eq!(encoded, vec![0x02, 0, 0, 0, 2, 0xde, 0xad]);
    }

    #[test]
    fn test_contract_call_payload_layout() {
        let contract =
            ContractPrincipal::parse("ST2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKQYAC0RQ.usdcx-v1").unwrap();
        let call = ContractCall::new(contract, "burn", vec![ClarityValue::Uint(7)]);
        let payload = call.encode_payload();

        assert_eq!(payload[0], 0x02);
        assert_eq!(payload[1], 26);
        assert_eq!(
            hex::encode(&payload[2..22]),
            "a46ff88886c2ef9762d970b4d2c63678835bd39d"
        );
        assert_eq!(payload[22], 8);
        assert_eq!(&payload[23..31], b"usdcx-v1");
        assert_eq!(payload[31], 4);
        assert_eq!(&payload[32..36], b"burn");
        assert_eq!(&payload[36..40], &1u32.to_be_bytes());
        assert_eq!(&payload[40..], ClarityValue::Uint(7).serialize().as_slice());
    }
}
