//! Block explorer links

use crate::address_codec::ChainTag;
use crate::types::Network;

const ETHERSCAN_MAINNET: &str = "https://etherscan.io";
const ETHERSCAN_SEPOLIA: &str = "https://sepolia.etherscan.io";
const HIRO_EXPLORER: &str = "https://explorer.hiro.so";

/// Public explorer URL for a transaction
///
/// `tx_id` is expected in normalized `0x`-prefixed form.
pub fn explorer_tx_url(tx_id: &str, chain: ChainTag, network: Network) -> String {
    match chain {
        ChainTag::Ethereum => {
            let base = if network.is_mainnet() {
                ETHERSCAN_MAINNET
            } else {
                ETHERSCAN_SEPOLIA
            };
            format!("{}/tx/{}", base, tx_id)
        }
        ChainTag::Stacks => format!("{}/txid/{}?chain={}", HIRO_EXPLORER, tx_id, network),
    }
}
